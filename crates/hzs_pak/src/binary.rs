//! Length-prefixed primitives shared by the index and directory tables.

use std::{
    fmt,
    io::{Read, Seek, SeekFrom},
    ops::Deref,
};

use binrw::{BinRead, BinResult, Endian};
use widestring::U16String;

/// Number of bytes left between the current position and the end of the stream
pub(crate) fn remaining<R: Seek>(reader: &mut R) -> std::io::Result<u64> {
    let pos = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(pos))?;
    Ok(end.saturating_sub(pos))
}

fn check_fits<R: Seek>(reader: &mut R, pos: u64, needed: u64, what: &str) -> BinResult<()> {
    let left = remaining(reader)?;
    if needed > left {
        return Err(binrw::Error::AssertFail {
            pos,
            message: format!("{what} of {needed} bytes exceeds the {left} bytes remaining"),
        });
    }
    Ok(())
}

/// Length-prefixed string
///
/// A signed 32-bit length `L` precedes the payload. `L > 0` is `L` single-byte
/// characters, `L < 0` is `-L` UTF-16 code units. Both forms carry a trailing
/// NUL which is not part of the value.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct FString(pub String);

impl Deref for FString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for FString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for FString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FString {
    fn from(value: &str) -> Self {
        FString(value.to_owned())
    }
}

impl BinRead for FString {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<Self> {
        let pos = reader.stream_position()?;
        let len = i32::read_options(reader, endian, ())?;

        if len == 0 {
            return Ok(FString::default());
        }

        let units = len.unsigned_abs() as u64;
        if len > 0 {
            check_fits(reader, pos, units, "string")?;

            let mut raw = vec![0u8; units as usize];
            reader.read_exact(&mut raw)?;
            while raw.last() == Some(&0) {
                raw.pop();
            }
            Ok(FString(String::from_utf8_lossy(&raw).into_owned()))
        } else {
            check_fits(reader, pos, units * 2, "wide string")?;

            let mut wide = Vec::with_capacity(units as usize);
            for _ in 0..units {
                wide.push(u16::read_options(reader, endian, ())?);
            }
            while wide.last() == Some(&0) {
                wide.pop();
            }
            Ok(FString(U16String::from_vec(wide).to_string_lossy()))
        }
    }
}

/// Reads a signed 32-bit length followed by that many raw bytes
#[binrw::parser(reader, endian)]
pub(crate) fn sized_blob() -> BinResult<Vec<u8>> {
    let pos = reader.stream_position()?;
    let len = i32::read_options(reader, endian, ())?;
    if len < 0 {
        return Err(binrw::Error::AssertFail {
            pos,
            message: format!("negative blob length {len}"),
        });
    }

    check_fits(reader, pos, len as u64, "blob")?;
    let mut data = vec![0u8; len as usize];
    reader.read_exact(&mut data)?;
    Ok(data)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::{BinReaderExt, BinRead};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::Result;

    #[test]
    fn read_empty() -> Result<()> {
        let mut input = Cursor::new(vec![0x00, 0x00, 0x00, 0x00]);
        assert_eq!(FString::read_le(&mut input)?, FString::default());
        Ok(())
    }

    #[test]
    fn read_narrow() -> Result<()> {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0x0A, 0x00, 0x00, 0x00,
            0x2E, 0x2E, 0x2F, 0x2E, 0x2E, 0x2F, 0x2E, 0x2E, 0x2F, 0x00,
        ]);
        assert_eq!(&*FString::read_le(&mut input)?, "../../../");
        assert_eq!(input.position(), 14);
        Ok(())
    }

    #[test]
    fn read_wide() -> Result<()> {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0xFD, 0xFF, 0xFF, 0xFF,
            0x48, 0x00, 0xE9, 0x00, 0x00, 0x00,
        ]);
        assert_eq!(&*FString::read_le(&mut input)?, "Hé");
        Ok(())
    }

    #[test]
    fn reject_oversized_length() {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0xFF, 0x00, 0x00, 0x00,
            0x41, 0x42, 0x00,
        ]);
        let err = input.read_le::<FString>().unwrap_err();
        assert!(matches!(err, binrw::Error::AssertFail { pos: 0, .. }));
    }

    #[test]
    fn reject_oversized_wide_length() {
        let mut input = Cursor::new(vec![0x00, 0x00, 0x00, 0x80]);
        assert!(input.read_le::<FString>().is_err());
    }

    #[test]
    fn read_blob() -> Result<()> {
        let mut input = Cursor::new(vec![0x03, 0x00, 0x00, 0x00, 0xAA, 0xBB, 0xCC, 0xDD]);
        let blob = sized_blob(&mut input, Endian::Little, ())?;
        assert_eq!(blob, vec![0xAA, 0xBB, 0xCC]);
        Ok(())
    }

    #[test]
    fn reject_negative_blob() {
        let mut input = Cursor::new(vec![0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(sized_blob(&mut input, Endian::Little, ()).is_err());
    }
}
