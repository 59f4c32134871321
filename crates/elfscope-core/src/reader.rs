//! Seekable byte-cursor primitive.
//!
//! [`BytestreamRead`] extends any `Read + Seek` source with exact-read
//! semantics and fixed-width integer reads in both endiannesses. Everything
//! else in the crate is built on these few methods.
//!
//! Two end-of-input conditions are kept distinct: a read that finds the
//! stream already exhausted ([`ElfError::EndOfStream`], the common
//! not-found signal) and a read that gets some bytes but not enough
//! ([`ElfError::ShortRead`], which means truncated input).

use std::io::{Read, Seek, SeekFrom};

use crate::{ElfError, ElfResult};

/// Byte order of multi-byte reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Little,
    Big,
}

/// Sign-extend a value of `bits` width via explicit two's complement:
/// subtract the sign bit's weight from the magnitude bits. Wrapping keeps
/// the full-width case (where the weight itself is `i64::MIN`) exact.
fn sign_extend(value: u64, bits: u32) -> i64 {
    let sign = 1u64 << (bits - 1);
    ((value & !sign) as i64).wrapping_sub((value & sign) as i64)
}

/// Cursor extension over any seekable byte source.
pub trait BytestreamRead: Read + Seek {
    /// Read exactly `len` bytes.
    ///
    /// # Errors
    ///
    /// [`ElfError::EndOfStream`] if no bytes are available at all,
    /// [`ElfError::ShortRead`] if some but fewer than `len` are.
    fn read_exactly(&mut self, len: usize) -> ElfResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let mut got = 0;
        while got < len {
            let n = self.read(&mut buf[got..])?;
            if n == 0 {
                return if got == 0 {
                    Err(ElfError::EndOfStream)
                } else {
                    Err(ElfError::ShortRead { wanted: len, got })
                };
            }
            got += n;
        }
        Ok(buf)
    }

    /// Current position in the stream.
    fn tell(&mut self) -> ElfResult<u64> {
        Ok(self.stream_position()?)
    }

    /// Seek to an absolute offset.
    fn seek_to(&mut self, offset: u64) -> ElfResult<()> {
        self.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn read_u8(&mut self) -> ElfResult<u8> {
        Ok(self.read_exactly(1)?[0])
    }

    fn read_u16_be(&mut self) -> ElfResult<u16> {
        let b = self.read_exactly(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u16_le(&mut self) -> ElfResult<u16> {
        let b = self.read_exactly(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn read_u32_be(&mut self) -> ElfResult<u32> {
        let b = self.read_exactly(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u32_le(&mut self) -> ElfResult<u32> {
        let b = self.read_exactly(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64_be(&mut self) -> ElfResult<u64> {
        let b = self.read_exactly(8)?;
        Ok(u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    fn read_u64_le(&mut self) -> ElfResult<u64> {
        let b = self.read_exactly(8)?;
        Ok(u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    fn read_s8(&mut self) -> ElfResult<i8> {
        Ok(sign_extend(u64::from(self.read_u8()?), 8) as i8)
    }

    fn read_s16_be(&mut self) -> ElfResult<i16> {
        Ok(sign_extend(u64::from(self.read_u16_be()?), 16) as i16)
    }

    fn read_s16_le(&mut self) -> ElfResult<i16> {
        Ok(sign_extend(u64::from(self.read_u16_le()?), 16) as i16)
    }

    fn read_s32_be(&mut self) -> ElfResult<i32> {
        Ok(sign_extend(u64::from(self.read_u32_be()?), 32) as i32)
    }

    fn read_s32_le(&mut self) -> ElfResult<i32> {
        Ok(sign_extend(u64::from(self.read_u32_le()?), 32) as i32)
    }

    fn read_s64_be(&mut self) -> ElfResult<i64> {
        Ok(sign_extend(self.read_u64_be()?, 64))
    }

    fn read_s64_le(&mut self) -> ElfResult<i64> {
        Ok(sign_extend(self.read_u64_le()?, 64))
    }

    fn read_u16(&mut self, endian: Endian) -> ElfResult<u16> {
        match endian {
            Endian::Big => self.read_u16_be(),
            Endian::Little => self.read_u16_le(),
        }
    }

    fn read_u32(&mut self, endian: Endian) -> ElfResult<u32> {
        match endian {
            Endian::Big => self.read_u32_be(),
            Endian::Little => self.read_u32_le(),
        }
    }

    fn read_u64(&mut self, endian: Endian) -> ElfResult<u64> {
        match endian {
            Endian::Big => self.read_u64_be(),
            Endian::Little => self.read_u64_le(),
        }
    }

    fn read_s16(&mut self, endian: Endian) -> ElfResult<i16> {
        match endian {
            Endian::Big => self.read_s16_be(),
            Endian::Little => self.read_s16_le(),
        }
    }

    fn read_s32(&mut self, endian: Endian) -> ElfResult<i32> {
        match endian {
            Endian::Big => self.read_s32_be(),
            Endian::Little => self.read_s32_le(),
        }
    }

    fn read_s64(&mut self, endian: Endian) -> ElfResult<i64> {
        match endian {
            Endian::Big => self.read_s64_be(),
            Endian::Little => self.read_s64_le(),
        }
    }

    /// Batched read of `count` 16-bit words.
    ///
    /// One bulk `read_exactly` instead of `count` scalar reads; the values
    /// are identical to calling [`BytestreamRead::read_u16`] `count` times.
    fn read_array_u16(&mut self, endian: Endian, count: usize) -> ElfResult<Vec<u16>> {
        let buf = self.read_exactly(count * 2)?;
        Ok(buf
            .chunks_exact(2)
            .map(|c| match endian {
                Endian::Big => u16::from_be_bytes([c[0], c[1]]),
                Endian::Little => u16::from_le_bytes([c[0], c[1]]),
            })
            .collect())
    }

    /// Batched read of `count` 32-bit words.
    fn read_array_u32(&mut self, endian: Endian, count: usize) -> ElfResult<Vec<u32>> {
        let buf = self.read_exactly(count * 4)?;
        Ok(buf
            .chunks_exact(4)
            .map(|c| match endian {
                Endian::Big => u32::from_be_bytes([c[0], c[1], c[2], c[3]]),
                Endian::Little => u32::from_le_bytes([c[0], c[1], c[2], c[3]]),
            })
            .collect())
    }

    /// Batched read of `count` 64-bit words.
    fn read_array_u64(&mut self, endian: Endian, count: usize) -> ElfResult<Vec<u64>> {
        let buf = self.read_exactly(count * 8)?;
        Ok(buf
            .chunks_exact(8)
            .map(|c| match endian {
                Endian::Big => u64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]),
                Endian::Little => {
                    u64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
                }
            })
            .collect())
    }
}

impl<T: Read + Seek + ?Sized> BytestreamRead for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_exact_read_distinctions() {
        let mut c = Cursor::new(vec![1u8, 2, 3]);
        assert_eq!(c.read_exactly(3).unwrap(), vec![1, 2, 3]);
        // Stream exhausted entirely.
        assert!(matches!(c.read_exactly(1), Err(ElfError::EndOfStream)));

        let mut c = Cursor::new(vec![1u8, 2, 3]);
        // Some bytes but not enough.
        assert!(matches!(
            c.read_exactly(4),
            Err(ElfError::ShortRead { wanted: 4, got: 3 })
        ));
    }

    #[test]
    fn test_endian_scalars() {
        let mut c = Cursor::new(vec![0x12u8, 0x34, 0x56, 0x78]);
        assert_eq!(c.read_u16_be().unwrap(), 0x1234);
        assert_eq!(c.read_u16_le().unwrap(), 0x7856);

        let mut c = Cursor::new(vec![0x12u8, 0x34, 0x56, 0x78]);
        assert_eq!(c.read_u32(Endian::Big).unwrap(), 0x1234_5678);
        c.seek_to(0).unwrap();
        assert_eq!(c.read_u32(Endian::Little).unwrap(), 0x7856_3412);
    }

    #[test]
    fn test_signed_sign_extension() {
        let mut c = Cursor::new(vec![0xffu8, 0xff, 0x80, 0x00, 0x7f]);
        assert_eq!(c.read_s16_be().unwrap(), -1);
        assert_eq!(c.read_s16_be().unwrap(), -32768);
        assert_eq!(c.read_s8().unwrap(), 127);

        let mut c = Cursor::new(0x8000_0000_0000_0000u64.to_be_bytes().to_vec());
        assert_eq!(c.read_s64_be().unwrap(), i64::MIN);
    }

    #[test]
    fn test_array_reads_match_scalar_reads() {
        let bytes: Vec<u8> = (0u8..32).collect();

        let mut c = Cursor::new(bytes.clone());
        let arr = c.read_array_u32(Endian::Little, 8).unwrap();

        let mut c = Cursor::new(bytes);
        let scalars: Vec<u32> = (0..8).map(|_| c.read_u32(Endian::Little).unwrap()).collect();
        assert_eq!(arr, scalars);
    }

    #[test]
    fn test_seek_and_tell() {
        let mut c = Cursor::new((0u8..16).collect::<Vec<u8>>());
        c.seek_to(10).unwrap();
        assert_eq!(c.tell().unwrap(), 10);
        assert_eq!(c.read_u8().unwrap(), 10);
    }
}
