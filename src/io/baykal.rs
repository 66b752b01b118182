//! Baykal digitiser records.
//!
//! Little-endian layout: a 120-byte station header, one 72-byte descriptor
//! per channel, then `i32` samples interleaved by channel.

use byteorder::{ByteOrder, LittleEndian};
use log::warn;
use ndarray::Array2;
use serde::Serialize;

use super::ReadError;

const HEADER: usize = 120;
const CHANNEL: usize = 72;
const SAMPLE: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaykalChannel {
    pub number: u16,
    pub name: String,
    pub sensor: String,
    pub coefficient: f64,
}

/// Station metadata stored ahead of the samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaykalHeader {
    pub version: u16,
    pub day: u16,
    pub month: u16,
    pub year: u16,
    pub adc_bits: u16,
    pub sampling_rate: u16,
    pub station: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Start of recording, in digitiser clock units.
    pub start_time: u64,
    pub channels: Vec<BaykalChannel>,
}

impl BaykalHeader {
    pub fn dt(&self) -> f64 {
        (self.sampling_rate as f64).recip()
    }
}

fn text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}

fn channel(raw: &[u8]) -> BaykalChannel {
    BaykalChannel {
        number: LittleEndian::read_u16(&raw[0..2]),
        name: text(&raw[8..32]),
        sensor: text(&raw[32..56]),
        coefficient: LittleEndian::read_f64(&raw[56..64]),
    }
}

/// Parses a Baykal file held in memory into its header and `[sample, channel]` counts.
pub fn parse(bytes: &[u8]) -> Result<(BaykalHeader, Array2<i32>), ReadError> {
    if bytes.len() < HEADER {
        return Err(ReadError::Truncated {
            expected: HEADER,
            found: bytes.len(),
        });
    }

    let read_u16 = |offset: usize| LittleEndian::read_u16(&bytes[offset..offset + 2]);
    let n_channels = read_u16(0) as usize;
    let sampling_rate = read_u16(22);
    if n_channels == 0 {
        return Err(ReadError::InvalidHeader("zero channels".into()));
    }
    if sampling_rate == 0 {
        return Err(ReadError::InvalidHeader("zero sampling frequency".into()));
    }

    let data_start = HEADER + n_channels * CHANNEL;
    if bytes.len() < data_start {
        return Err(ReadError::Truncated {
            expected: data_start,
            found: bytes.len(),
        });
    }

    let header = BaykalHeader {
        version: read_u16(4),
        day: read_u16(6),
        month: read_u16(8),
        year: read_u16(10),
        adc_bits: read_u16(18),
        sampling_rate,
        station: text(&bytes[32..48]),
        latitude: LittleEndian::read_f64(&bytes[72..80]),
        longitude: LittleEndian::read_f64(&bytes[80..88]),
        start_time: LittleEndian::read_u64(&bytes[104..112]),
        channels: bytes[HEADER..data_start]
            .chunks_exact(CHANNEL)
            .map(channel)
            .collect(),
    };

    let frame = n_channels * SAMPLE;
    let body = &bytes[data_start..];
    let nt = body.len() / frame;
    if body.len() % frame != 0 {
        warn!(
            "ignoring {} trailing bytes after {} samples",
            body.len() % frame,
            nt
        );
    }
    let mut samples = vec![0i32; nt * n_channels];
    LittleEndian::read_i32_into(&body[..nt * frame], &mut samples);
    let data = Array2::from_shape_vec((nt, n_channels), samples)
        .map_err(|e| ReadError::InvalidHeader(e.to_string()))?;

    Ok((header, data))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Builds a Baykal image; `rows[t][c]` is sample `t` of channel `c`.
    pub(crate) fn baykal_bytes(rate: u16, rows: &[Vec<i32>]) -> Vec<u8> {
        let n_channels = rows[0].len();
        let mut bytes = vec![0u8; HEADER + n_channels * CHANNEL];
        LittleEndian::write_u16(&mut bytes[0..2], n_channels as u16);
        LittleEndian::write_u16(&mut bytes[4..6], 53);
        LittleEndian::write_u16(&mut bytes[6..8], 17);
        LittleEndian::write_u16(&mut bytes[8..10], 6);
        LittleEndian::write_u16(&mut bytes[10..12], 2021);
        LittleEndian::write_u16(&mut bytes[18..20], 24);
        LittleEndian::write_u16(&mut bytes[22..24], rate);
        bytes[32..37].copy_from_slice(b"IRK01");
        LittleEndian::write_f64(&mut bytes[72..80], 52.25);
        LittleEndian::write_f64(&mut bytes[80..88], 104.5);
        LittleEndian::write_u64(&mut bytes[104..112], 1_234_567);
        for c in 0..n_channels {
            let raw = &mut bytes[HEADER + c * CHANNEL..HEADER + (c + 1) * CHANNEL];
            LittleEndian::write_u16(&mut raw[0..2], c as u16 + 1);
            raw[8..9].copy_from_slice(["Z", "X", "Y"][c % 3].as_bytes());
            raw[32..38].copy_from_slice(b"CME-4T");
            LittleEndian::write_f64(&mut raw[56..64], 0.5);
        }
        for row in rows {
            for &v in row {
                bytes.extend(v.to_le_bytes());
            }
        }
        bytes
    }

    #[test]
    fn reads_header_and_interleaved_samples() {
        let rows = vec![vec![1, -1, 7], vec![2, -2, 8], vec![3, -3, 9]];
        let (header, data) = parse(&baykal_bytes(100, &rows)).unwrap();

        assert_eq!(header.sampling_rate, 100);
        assert_relative_eq!(header.dt(), 0.01);
        assert_eq!(header.station, "IRK01");
        assert_eq!((header.day, header.month, header.year), (17, 6, 2021));
        assert_eq!(header.adc_bits, 24);
        assert_relative_eq!(header.latitude, 52.25);
        assert_relative_eq!(header.longitude, 104.5);
        assert_eq!(header.start_time, 1_234_567);
        assert_eq!(header.channels.len(), 3);
        assert_eq!(header.channels[1].number, 2);
        assert_eq!(header.channels[1].name, "X");
        assert_eq!(header.channels[2].sensor, "CME-4T");

        assert_eq!(data.dim(), (3, 3));
        assert_eq!(data.column(1).to_vec(), vec![-1, -2, -3]);
        assert_eq!(data.row(2).to_vec(), vec![3, -3, 9]);
    }

    #[test]
    fn partial_frame_is_dropped() {
        let mut bytes = baykal_bytes(50, &[vec![4, 5], vec![6, 7]]);
        bytes.extend([1, 2, 3, 4]);
        let (_, data) = parse(&bytes).unwrap();
        assert_eq!(data.dim(), (2, 2));
    }

    #[test]
    fn malformed_headers() {
        assert!(matches!(parse(&[0u8; 10]), Err(ReadError::Truncated { .. })));

        let mut bytes = baykal_bytes(50, &[vec![4, 5]]);
        LittleEndian::write_u16(&mut bytes[22..24], 0);
        assert!(matches!(parse(&bytes), Err(ReadError::InvalidHeader(_))));

        let bytes = baykal_bytes(50, &[vec![4, 5]]);
        assert!(matches!(
            parse(&bytes[..HEADER + CHANNEL]),
            Err(ReadError::Truncated { .. })
        ));
    }
}
