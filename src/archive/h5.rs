//! HDF5-backed archives
//!
//! Fast5 files are plain HDF5. Attributes and string datasets come in fixed and
//! variable length flavours, and event tables are compound datasets whose member
//! list differs between basecaller versions, so compound data is read through a
//! packed in-memory copy of the stored type and decoded field by field.

use std::path::Path;

use byteorder::{ByteOrder, NativeEndian};
use hdf5::types::{TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Attribute, Container, Dataset, Datatype, File};
use hdf5_sys::{h5a::H5Aread, h5d::H5Dread, h5p::H5P_DEFAULT, h5s::H5S_ALL};

use super::{Archive, ArchiveSource, AttrValue, Result, Table, Value};
use crate::error::ArchiveError;

/// Opens fast5 files with the HDF5 library
#[derive(Debug, Clone, Copy, Default)]
pub struct Hdf5Source;

impl ArchiveSource for Hdf5Source {
    type Archive = Hdf5Archive;

    fn open(&self, path: &Path) -> Result<Self::Archive> {
        Hdf5Archive::open(path)
    }
}

/// A read-only HDF5 file
///
/// The underlying handle is closed when the archive is dropped.
pub struct Hdf5Archive {
    file: File,
}
impl Hdf5Archive {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ArchiveError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { file })
    }

    fn dataset(&self, path: &str) -> Result<Dataset> {
        if !self.exists(path) {
            return Err(ArchiveError::absent(path));
        }
        self.file.dataset(path).map_err(read_error(path))
    }

    fn attribute(&self, path: &str, key: &str) -> Result<Attribute> {
        if !self.exists(path) {
            return Err(ArchiveError::absent(path));
        }
        let attr = match self.file.group(path) {
            Ok(group) => group.attr(key),
            Err(_) => self.file.dataset(path).map_err(read_error(path))?.attr(key),
        };
        attr.map_err(|_| ArchiveError::AttributeMissing {
            path: path.to_string(),
            key: key.to_string(),
        })
    }
}

impl Archive for Hdf5Archive {
    fn exists(&self, path: &str) -> bool {
        // intermediate groups must be checked one at a time
        let mut prefix = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            prefix.push('/');
            prefix.push_str(part);
            if !self.file.link_exists(&prefix) {
                return false;
            }
        }
        true
    }

    fn children(&self, path: &str) -> Result<Vec<String>> {
        if !self.exists(path) {
            return Err(ArchiveError::absent(path));
        }
        let group = self.file.group(path).map_err(read_error(path))?;
        let mut names = group.member_names().map_err(read_error(path))?;
        names.sort();
        Ok(names)
    }

    fn attr(&self, path: &str, key: &str) -> Result<AttrValue> {
        let attr = self.attribute(path, key)?;
        read_attr_value(&attr, path)
    }

    fn table(&self, path: &str) -> Result<Table> {
        let dataset = self.dataset(path)?;
        let descriptor = descriptor_of(&dataset, path)?;
        let TypeDescriptor::Compound(compound) = descriptor else {
            return Err(ArchiveError::FieldType {
                path: path.to_string(),
                field: String::new(),
                expected: "a compound record",
            });
        };
        let mut packed = compound.to_packed_repr();
        let mem_type = Datatype::from_descriptor(&TypeDescriptor::Compound(packed.clone()))
            .map_err(read_error(path))?;
        let bytes = RawSource::Dataset(&dataset).read_bytes(&mem_type, packed.size * dataset.size(), path)?;

        packed.fields.sort_by_key(|f| f.index);
        let names = packed.fields.iter().map(|f| f.name.clone()).collect();
        let mut table = Table::new(path, names);
        for record in bytes.chunks_exact(packed.size) {
            let row = packed
                .fields
                .iter()
                .map(|f| decode_field(&f.ty, &record[f.offset..f.offset + f.ty.size()], path, &f.name))
                .collect::<Result<Vec<_>>>()?;
            table.push_row(row);
        }
        Ok(table)
    }

    fn signal(&self, path: &str) -> Result<Vec<u16>> {
        let dataset = self.dataset(path)?;
        dataset.read_raw::<u16>().map_err(read_error(path))
    }

    fn text(&self, path: &str) -> Result<String> {
        let dataset = self.dataset(path)?;
        read_string(&dataset, RawSource::Dataset(&dataset), path)
    }
}

/// Something `H5Aread`/`H5Dread` can fill with bytes of a given memory type
enum RawSource<'a> {
    Attr(&'a Attribute),
    Dataset(&'a Dataset),
}
impl RawSource<'_> {
    fn read_bytes(&self, mem_type: &Datatype, len: usize, path: &str) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        if len == 0 {
            return Ok(buf);
        }
        let status = match self {
            // SAFETY: the buffer holds `len` bytes, the size of every element of
            // the selection in `mem_type`, and outlives the call.
            Self::Attr(attr) => unsafe { H5Aread(attr.id(), mem_type.id(), buf.as_mut_ptr().cast()) },
            Self::Dataset(ds) => unsafe {
                H5Dread(
                    ds.id(),
                    mem_type.id(),
                    H5S_ALL,
                    H5S_ALL,
                    H5P_DEFAULT,
                    buf.as_mut_ptr().cast(),
                )
            },
        };
        if status < 0 {
            return Err(ArchiveError::Unreadable {
                path: path.to_string(),
                reason: "raw read failed".to_string(),
            });
        }
        Ok(buf)
    }
}

fn read_error(path: &str) -> impl Fn(hdf5::Error) -> ArchiveError + '_ {
    move |e| ArchiveError::Unreadable {
        path: path.to_string(),
        reason: e.to_string(),
    }
}

fn descriptor_of(container: &Container, path: &str) -> Result<TypeDescriptor> {
    container
        .dtype()
        .and_then(|dtype| dtype.to_descriptor())
        .map_err(read_error(path))
}

fn read_attr_value(attr: &Attribute, path: &str) -> Result<AttrValue> {
    let value = match descriptor_of(attr, path)? {
        TypeDescriptor::Integer(_) => {
            first(attr.read_raw::<i64>().map_err(read_error(path))?).map(AttrValue::Int)
        }
        TypeDescriptor::Unsigned(_) => first(attr.read_raw::<u64>().map_err(read_error(path))?)
            .and_then(|v| i64::try_from(v).ok())
            .map(AttrValue::Int),
        TypeDescriptor::Float(_) => {
            first(attr.read_raw::<f64>().map_err(read_error(path))?).map(AttrValue::Float)
        }
        _ => Some(AttrValue::Text(read_string(attr, RawSource::Attr(attr), path)?)),
    };
    value.ok_or_else(|| ArchiveError::AttributeType {
        path: path.to_string(),
        key: attr.name(),
        expected: "a scalar",
    })
}

fn first<T>(values: Vec<T>) -> Option<T> {
    values.into_iter().next()
}

fn read_string(container: &Container, source: RawSource<'_>, path: &str) -> Result<String> {
    match descriptor_of(container, path)? {
        TypeDescriptor::VarLenAscii => Ok(container
            .read_raw::<VarLenAscii>()
            .map_err(read_error(path))?
            .first()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default()),
        TypeDescriptor::VarLenUnicode => Ok(container
            .read_raw::<VarLenUnicode>()
            .map_err(read_error(path))?
            .first()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default()),
        descriptor @ (TypeDescriptor::FixedAscii(n) | TypeDescriptor::FixedUnicode(n)) => {
            let mem_type = Datatype::from_descriptor(&descriptor).map_err(read_error(path))?;
            let bytes = source.read_bytes(&mem_type, n * container.size().max(1), path)?;
            Ok(fixed_string(&bytes[..n]))
        }
        _ => Err(ArchiveError::FieldType {
            path: path.to_string(),
            field: String::new(),
            expected: "a string",
        }),
    }
}

/// Fixed-length strings are NUL terminated or NUL/space padded
fn fixed_string(bytes: &[u8]) -> String {
    let end = memchr::memchr(0, bytes).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim_end().to_string()
}

fn decode_field(ty: &TypeDescriptor, bytes: &[u8], path: &str, field: &str) -> Result<Value> {
    let value = match ty {
        TypeDescriptor::Integer(_) | TypeDescriptor::Boolean => decode_signed(bytes).map(Value::Int),
        TypeDescriptor::Unsigned(_) => decode_unsigned(bytes).map(Value::UInt),
        TypeDescriptor::Enum(e) if e.signed => decode_signed(bytes).map(Value::Int),
        TypeDescriptor::Enum(_) => decode_unsigned(bytes).map(Value::UInt),
        TypeDescriptor::Float(_) => match bytes.len() {
            4 => Some(Value::Float32(NativeEndian::read_f32(bytes))),
            8 => Some(Value::Float(NativeEndian::read_f64(bytes))),
            _ => None,
        },
        TypeDescriptor::FixedAscii(_) | TypeDescriptor::FixedUnicode(_) => {
            Some(Value::Text(fixed_string(bytes)))
        }
        _ => None,
    };
    value.ok_or_else(|| ArchiveError::FieldType {
        path: path.to_string(),
        field: field.to_string(),
        expected: "a numeric or fixed string member",
    })
}

fn decode_signed(bytes: &[u8]) -> Option<i64> {
    match bytes.len() {
        1 => Some(i64::from(bytes[0] as i8)),
        2 => Some(i64::from(NativeEndian::read_i16(bytes))),
        4 => Some(i64::from(NativeEndian::read_i32(bytes))),
        8 => Some(NativeEndian::read_i64(bytes)),
        _ => None,
    }
}

fn decode_unsigned(bytes: &[u8]) -> Option<u64> {
    match bytes.len() {
        1 => Some(u64::from(bytes[0])),
        2 => Some(u64::from(NativeEndian::read_u16(bytes))),
        4 => Some(u64::from(NativeEndian::read_u32(bytes))),
        8 => Some(NativeEndian::read_u64(bytes)),
        _ => None,
    }
}
