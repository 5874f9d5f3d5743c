use std::io::{self, Write};

use crate::locate::ReadRecord;
use crate::meta::RunMeta;

/// Columns leading every tabular row
pub(crate) const READ_COLUMNS: [&str; 4] = ["runID", "channel", "mux", "read"];

pub(crate) fn write_int<W: Write>(writer: &mut W, value: i64) -> io::Result<()> {
    let mut buf = itoa::Buffer::new();
    writer.write_all(buf.format(value).as_bytes())
}

/// Writes a header row made of the read columns followed by `extra`
pub(crate) fn write_header<W, S>(writer: &mut W, extra: &[S]) -> io::Result<()>
where
    W: Write,
    S: AsRef<str>,
{
    writer.write_all(READ_COLUMNS.join(",").as_bytes())?;
    for name in extra {
        writer.write_all(b",")?;
        writer.write_all(name.as_ref().as_bytes())?;
    }
    writer.write_all(b"\n")
}

/// Writes `runID,channel,mux,read` without a trailing separator
pub(crate) fn write_read_columns<W: Write>(
    writer: &mut W,
    meta: &RunMeta,
    read: &ReadRecord,
) -> io::Result<()> {
    writer.write_all(meta.run_id.as_bytes())?;
    writer.write_all(b",")?;
    write_int(writer, meta.channel)?;
    writer.write_all(b",")?;
    write_int(writer, read.mux)?;
    writer.write_all(b",")?;
    writer.write_all(read.name.as_bytes())
}

/// Writes `,a,b,c` for a slice of integers
pub(crate) fn write_ints<W: Write>(writer: &mut W, values: &[i64]) -> io::Result<()> {
    for &value in values {
        writer.write_all(b",")?;
        write_int(writer, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_write_header() {
        let mut buf = Vec::new();
        write_header(&mut buf, &["start", "length"]).unwrap();
        assert_eq!(buf, b"runID,channel,mux,read,start,length\n");

        buf.clear();
        write_header::<_, &str>(&mut buf, &[]).unwrap();
        assert_eq!(buf, b"runID,channel,mux,read\n");
    }

    #[test]
    fn test_write_ints() {
        let mut buf = Vec::new();
        write_ints(&mut buf, &[0, -1, 4000]).unwrap();
        assert_eq!(buf, b",0,-1,4000");
    }
}
