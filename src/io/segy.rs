//! SEG-Y reader.
//!
//! Only what a passive record needs is decoded: sample interval, samples
//! per trace, sample format and the trace samples themselves. The binary
//! header is read big-endian first and little-endian when the sample
//! format code is unknown.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::warn;
use ndarray::Array2;

use super::ReadError;

const TEXT_HEADER: usize = 3200;
const BINARY_HEADER: usize = 400;
const TRACE_HEADER: usize = 240;

// binary header byte offsets, relative to the start of the file
const INTERVAL: usize = 3216;
const SAMPLES: usize = 3220;
const FORMAT: usize = 3224;
const EXTENDED_HEADERS: usize = 3504;

// trace header byte offsets
const TRACE_SAMPLES: usize = 114;
const TRACE_INTERVAL: usize = 116;

/// Sample encodings understood by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    IbmFloat,
    Int32,
    Int16,
    IeeeFloat,
    Int8,
}

impl SampleFormat {
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Self::IbmFloat),
            2 => Some(Self::Int32),
            3 => Some(Self::Int16),
            5 => Some(Self::IeeeFloat),
            8 => Some(Self::Int8),
            _ => None,
        }
    }

    pub fn code(&self) -> i16 {
        match self {
            Self::IbmFloat => 1,
            Self::Int32 => 2,
            Self::Int16 => 3,
            Self::IeeeFloat => 5,
            Self::Int8 => 8,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Self::IbmFloat | Self::Int32 | Self::IeeeFloat => 4,
            Self::Int16 => 2,
            Self::Int8 => 1,
        }
    }
}

/// Converts a 32-bit IBM System/360 float.
pub fn ibm_to_f64(bits: u32) -> f64 {
    let sign = if bits & 0x8000_0000 != 0 { -1.0 } else { 1.0 };
    let exponent = ((bits >> 24) & 0x7f) as i32 - 64;
    let mantissa = (bits & 0x00ff_ffff) as f64 / 16_777_216.0;
    sign * mantissa * 16f64.powi(exponent)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Big,
    Little,
}

/// Decoded SEG-Y record: `[sample, trace]` matrix and sampling interval in seconds.
#[derive(Debug, Clone)]
pub struct SegyData {
    pub data: Array2<f64>,
    pub dt: f64,
    pub format: SampleFormat,
    pub endianness: Endianness,
}

struct BinaryHeader {
    interval_us: u16,
    samples: u16,
    format: SampleFormat,
    extended: usize,
}

fn binary_header<B: ByteOrder>(bytes: &[u8]) -> Option<BinaryHeader> {
    let format = SampleFormat::from_code(B::read_i16(&bytes[FORMAT..FORMAT + 2]))?;
    let extended = B::read_i16(&bytes[EXTENDED_HEADERS..EXTENDED_HEADERS + 2]).max(0) as usize;
    Some(BinaryHeader {
        interval_us: B::read_u16(&bytes[INTERVAL..INTERVAL + 2]),
        samples: B::read_u16(&bytes[SAMPLES..SAMPLES + 2]),
        format,
        extended,
    })
}

fn decode<B: ByteOrder>(format: SampleFormat, raw: &[u8]) -> f64 {
    match format {
        SampleFormat::IbmFloat => ibm_to_f64(B::read_u32(raw)),
        SampleFormat::Int32 => B::read_i32(raw) as f64,
        SampleFormat::Int16 => B::read_i16(raw) as f64,
        SampleFormat::IeeeFloat => B::read_f32(raw) as f64,
        SampleFormat::Int8 => raw[0] as i8 as f64,
    }
}

fn read_traces<B: ByteOrder>(
    bytes: &[u8],
    header: BinaryHeader,
    endianness: Endianness,
) -> Result<SegyData, ReadError> {
    let start = TEXT_HEADER + BINARY_HEADER + header.extended * TEXT_HEADER;
    if bytes.len() < start + TRACE_HEADER {
        return Err(ReadError::Truncated {
            expected: start + TRACE_HEADER,
            found: bytes.len(),
        });
    }

    // fall back on the first trace header when the binary header is blank
    let first = &bytes[start..start + TRACE_HEADER];
    let samples = match header.samples {
        0 => B::read_u16(&first[TRACE_SAMPLES..TRACE_SAMPLES + 2]),
        n => n,
    } as usize;
    let interval_us = match header.interval_us {
        0 => B::read_u16(&first[TRACE_INTERVAL..TRACE_INTERVAL + 2]),
        n => n,
    };
    if samples == 0 {
        return Err(ReadError::InvalidHeader("zero samples per trace".into()));
    }
    if interval_us == 0 {
        return Err(ReadError::InvalidHeader("zero sample interval".into()));
    }

    let size = header.format.size();
    let trace_len = TRACE_HEADER + samples * size;
    let body = bytes.len() - start;
    let n_traces = body / trace_len;
    if n_traces == 0 {
        return Err(ReadError::Truncated {
            expected: start + trace_len,
            found: bytes.len(),
        });
    }
    if body % trace_len != 0 {
        warn!(
            "ignoring {} trailing bytes after {} traces",
            body % trace_len,
            n_traces
        );
    }

    let mut data = Array2::zeros((samples, n_traces));
    for (j, mut column) in data.columns_mut().into_iter().enumerate() {
        let offset = start + j * trace_len + TRACE_HEADER;
        let raw = &bytes[offset..offset + samples * size];
        for (value, chunk) in column.iter_mut().zip(raw.chunks_exact(size)) {
            *value = decode::<B>(header.format, chunk);
        }
    }

    Ok(SegyData {
        data,
        dt: interval_us as f64 * 1e-6,
        format: header.format,
        endianness,
    })
}

/// Parses a SEG-Y file held in memory.
pub fn parse(bytes: &[u8]) -> Result<SegyData, ReadError> {
    let minimum = TEXT_HEADER + BINARY_HEADER;
    if bytes.len() < minimum {
        return Err(ReadError::Truncated {
            expected: minimum,
            found: bytes.len(),
        });
    }

    if let Some(header) = binary_header::<BigEndian>(bytes) {
        return read_traces::<BigEndian>(bytes, header, Endianness::Big);
    }
    if let Some(header) = binary_header::<LittleEndian>(bytes) {
        warn!("SEG-Y binary header is not big-endian, reading as little-endian");
        return read_traces::<LittleEndian>(bytes, header, Endianness::Little);
    }
    Err(ReadError::UnsupportedSampleFormat(BigEndian::read_i16(
        &bytes[FORMAT..FORMAT + 2],
    )))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use byteorder::WriteBytesExt;

    /// Builds a SEG-Y image with `traces[j]` as trace `j`, encoded in format `code`.
    pub(crate) fn segy_bytes<B: ByteOrder>(traces: &[Vec<f64>], interval_us: u16, code: i16) -> Vec<u8> {
        let ns = traces[0].len();
        let mut bytes = vec![b' '; TEXT_HEADER];
        let mut binary = vec![0u8; BINARY_HEADER];
        B::write_u16(&mut binary[16..18], interval_us);
        B::write_u16(&mut binary[20..22], ns as u16);
        B::write_i16(&mut binary[24..26], code);
        bytes.extend(binary);

        for trace in traces {
            let mut header = vec![0u8; TRACE_HEADER];
            B::write_u16(&mut header[TRACE_SAMPLES..TRACE_SAMPLES + 2], ns as u16);
            B::write_u16(&mut header[TRACE_INTERVAL..TRACE_INTERVAL + 2], interval_us);
            bytes.extend(header);
            for &v in trace {
                match code {
                    2 => bytes.write_i32::<B>(v as i32).unwrap(),
                    3 => bytes.write_i16::<B>(v as i16).unwrap(),
                    5 => bytes.write_f32::<B>(v as f32).unwrap(),
                    8 => bytes.write_i8(v as i8).unwrap(),
                    _ => panic!("unsupported test format {code}"),
                }
            }
        }
        bytes
    }

    fn traces() -> Vec<Vec<f64>> {
        vec![vec![1.0, -2.0, 3.0], vec![4.0, 5.0, -6.0]]
    }

    #[test]
    fn ibm_floats() {
        assert_relative_eq!(ibm_to_f64(0x4110_0000), 1.0);
        assert_relative_eq!(ibm_to_f64(0x4264_0000), 100.0);
        assert_relative_eq!(ibm_to_f64(0xC276_A000), -118.625);
        assert_eq!(ibm_to_f64(0), 0.0);
    }

    #[test]
    fn format_codes() {
        use SampleFormat::*;
        for format in [IbmFloat, Int32, Int16, IeeeFloat, Int8] {
            assert_eq!(SampleFormat::from_code(format.code()), Some(format));
        }
        assert_eq!(IeeeFloat.code(), 5);
        assert_eq!(SampleFormat::from_code(4), None);
    }

    #[test]
    fn big_endian_ieee() {
        let segy = parse(&segy_bytes::<BigEndian>(&traces(), 2000, 5)).unwrap();
        assert_eq!(segy.endianness, Endianness::Big);
        assert_eq!(segy.format, SampleFormat::IeeeFloat);
        assert_relative_eq!(segy.dt, 0.002);
        assert_eq!(segy.data.dim(), (3, 2));
        assert_eq!(segy.data[[1, 0]], -2.0);
        assert_eq!(segy.data[[2, 1]], -6.0);
    }

    #[test]
    fn little_endian_is_recovered() {
        let segy = parse(&segy_bytes::<LittleEndian>(&traces(), 4000, 3)).unwrap();
        assert_eq!(segy.endianness, Endianness::Little);
        assert_eq!(segy.format, SampleFormat::Int16);
        assert_relative_eq!(segy.dt, 0.004);
        assert_eq!(segy.data.column(1).to_vec(), vec![4.0, 5.0, -6.0]);
    }

    #[test]
    fn integer_formats() {
        for code in [2, 8] {
            let segy = parse(&segy_bytes::<BigEndian>(&traces(), 1000, code)).unwrap();
            assert_eq!(segy.data.column(0).to_vec(), vec![1.0, -2.0, 3.0]);
        }
    }

    #[test]
    fn ibm_samples() {
        let mut bytes = segy_bytes::<BigEndian>(&[vec![0.0, 0.0]], 1000, 2);
        BigEndian::write_i16(&mut bytes[FORMAT..FORMAT + 2], 1);
        let first = TEXT_HEADER + BINARY_HEADER + TRACE_HEADER;
        BigEndian::write_u32(&mut bytes[first..first + 4], 0xC276_A000);
        let segy = parse(&bytes).unwrap();
        assert_relative_eq!(segy.data[[0, 0]], -118.625);
    }

    #[test]
    fn malformed_files() {
        assert!(matches!(parse(&[0u8; 100]), Err(ReadError::Truncated { .. })));

        let mut bytes = segy_bytes::<BigEndian>(&traces(), 2000, 5);
        BigEndian::write_i16(&mut bytes[FORMAT..FORMAT + 2], 4);
        assert!(matches!(parse(&bytes), Err(ReadError::UnsupportedSampleFormat(4))));

        let bytes = segy_bytes::<BigEndian>(&traces(), 2000, 5);
        let headers_only = &bytes[..TEXT_HEADER + BINARY_HEADER + TRACE_HEADER + 4];
        assert!(matches!(parse(headers_only), Err(ReadError::Truncated { .. })));
    }
}
