//! Hierarchical container file
//!
//! A [`Container`] is a tree of named groups carrying attributes, with
//! resizable one-dimensional typed arrays as leaves. The whole tree is
//! rebuilt in memory by replaying the file's records; every mutation is
//! applied to the tree and appended to the file as one framed record.
//!
//! ## Consistency
//!
//! Records are applied in file order, so a reader always observes a prefix
//! of the writer's mutations. A torn tail record (crash mid-write, or a
//! writer still appending) ends replay. [`Container::refresh`] resumes
//! replay from the end of the last complete record.

use datachest_core::{DType, Value};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::array::ArrayData;
use crate::error::{StorageError, StorageResult};
use crate::format::{self, FrameRead, FRAME_HEADER_SIZE, HEADER_SIZE};
use crate::record::Record;

/// How a container was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Reads only; mutations fail
    ReadOnly,
    /// Reads and appends
    ReadWrite,
}

/// Attribute map of a group or array
pub type Attributes = BTreeMap<String, Value>;

/// A named group
#[derive(Debug, Clone, Default)]
pub struct Group {
    attrs: Attributes,
    children: BTreeMap<String, Node>,
}

/// Child of a group
#[derive(Debug, Clone)]
pub enum Node {
    /// Nested group
    Group(Group),
    /// Typed array
    Array(Array),
}

/// A resizable one-dimensional typed array
#[derive(Debug, Clone)]
pub struct Array {
    chunk_len: u64,
    chunks: u64,
    attrs: Attributes,
    data: ArrayData,
}

impl Group {
    /// Attributes of this group
    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// Names of child groups, sorted
    pub fn group_names(&self) -> Vec<&str> {
        self.children
            .iter()
            .filter(|(_, node)| matches!(node, Node::Group(_)))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Names of child arrays, sorted
    pub fn array_names(&self) -> Vec<&str> {
        self.children
            .iter()
            .filter(|(_, node)| matches!(node, Node::Array(_)))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Child group by name
    pub fn group(&self, name: &str) -> Option<&Group> {
        match self.children.get(name)? {
            Node::Group(g) => Some(g),
            Node::Array(_) => None,
        }
    }

    /// Check if a child of any kind exists
    pub fn contains(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }
}

impl Array {
    /// Element dtype
    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    /// Number of stored elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the array holds no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Elements per logical chunk
    pub fn chunk_len(&self) -> u64 {
        self.chunk_len
    }

    /// Number of extension chunks written
    pub fn chunk_count(&self) -> u64 {
        self.chunks
    }

    /// Attributes of this array
    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// Stored elements
    pub fn data(&self) -> &ArrayData {
        &self.data
    }
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn find_group<'a>(root: &'a Group, segments: &[&str]) -> Option<&'a Group> {
    let mut group = root;
    for segment in segments {
        group = group.group(segment)?;
    }
    Some(group)
}

fn find_group_mut<'a>(root: &'a mut Group, segments: &[&str]) -> Option<&'a mut Group> {
    let mut group = root;
    for segment in segments {
        group = match group.children.get_mut(*segment)? {
            Node::Group(g) => g,
            Node::Array(_) => return None,
        };
    }
    Some(group)
}

/// Hierarchical container backed by one append-only file
#[derive(Debug)]
pub struct Container {
    path: PathBuf,
    mode: AccessMode,
    root: Group,
    writer: Option<BufWriter<File>>,
    /// Byte offset just past the last applied record
    end_offset: u64,
    records: u64,
}

impl Container {
    /// Create a new, empty container; fails if the file already exists
    pub fn create(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    StorageError::AlreadyExists(path.display().to_string())
                } else {
                    StorageError::Io(e)
                }
            })?;
        let mut writer = BufWriter::new(file);
        format::write_header(&mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_data()?;
        debug!(path = %path.display(), "created container");

        Ok(Self {
            path,
            mode: AccessMode::ReadWrite,
            root: Group::default(),
            writer: Some(writer),
            end_offset: HEADER_SIZE,
            records: 0,
        })
    }

    /// Open an existing container by replaying its records
    ///
    /// A torn tail is ignored; in [`AccessMode::ReadWrite`] it is also
    /// truncated so new records follow the last complete one.
    pub fn open(path: impl AsRef<Path>, mode: AccessMode) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut reader = BufReader::new(File::open(&path)?);
        format::read_header(&mut reader, &path.display().to_string())?;

        let mut container = Self {
            path,
            mode,
            root: Group::default(),
            writer: None,
            end_offset: HEADER_SIZE,
            records: 0,
        };
        let torn = container.replay(&mut reader)?;

        if mode == AccessMode::ReadWrite {
            let file = OpenOptions::new().write(true).open(&container.path)?;
            if torn {
                warn!(
                    path = %container.path.display(),
                    offset = container.end_offset,
                    "truncating torn tail record"
                );
                file.set_len(container.end_offset)?;
            }
            let mut writer = BufWriter::new(file);
            writer.seek(SeekFrom::Start(container.end_offset))?;
            container.writer = Some(writer);
        }

        debug!(
            path = %container.path.display(),
            records = container.records,
            ?mode,
            "opened container"
        );
        Ok(container)
    }

    /// Replay frames until end of file or a torn frame; returns true if torn
    fn replay<R: std::io::Read>(&mut self, reader: &mut R) -> StorageResult<bool> {
        loop {
            match format::read_frame(reader)? {
                FrameRead::End => return Ok(false),
                FrameRead::Torn(reason) => {
                    warn!(
                        path = %self.path.display(),
                        offset = self.end_offset,
                        %reason,
                        "stopping replay at torn record"
                    );
                    return Ok(true);
                }
                FrameRead::Payload(payload) => {
                    let record = Record::decode(&payload)?;
                    self.apply(record)?;
                    self.end_offset += FRAME_HEADER_SIZE + payload.len() as u64;
                    self.records += 1;
                }
            }
        }
    }

    /// Pick up records appended by another writer since the last replay
    ///
    /// Returns the number of records applied. Writable containers are their
    /// own writer and always return 0.
    pub fn refresh(&mut self) -> StorageResult<u64> {
        if self.writer.is_some() {
            return Ok(0);
        }
        let before = self.records;
        let mut reader = BufReader::new(File::open(&self.path)?);
        reader.seek(SeekFrom::Start(self.end_offset))?;
        self.replay(&mut reader)?;
        Ok(self.records - before)
    }

    fn apply(&mut self, record: Record) -> StorageResult<()> {
        match record {
            Record::CreateGroup { path } => {
                let (parent, name) = self.parent_mut(&path)?;
                if parent.children.contains_key(&name) {
                    return Err(StorageError::AlreadyExists(path));
                }
                parent.children.insert(name, Node::Group(Group::default()));
            }
            Record::CreateArray {
                path,
                dtype,
                chunk_len,
            } => {
                let (parent, name) = self.parent_mut(&path)?;
                if parent.children.contains_key(&name) {
                    return Err(StorageError::AlreadyExists(path));
                }
                parent.children.insert(
                    name,
                    Node::Array(Array {
                        chunk_len,
                        chunks: 0,
                        attrs: Attributes::new(),
                        data: ArrayData::empty(dtype),
                    }),
                );
            }
            Record::SetAttr { path, name, value } => {
                let attrs = self
                    .attrs_mut(&path)
                    .ok_or_else(|| StorageError::NoSuchNode(path.clone()))?;
                attrs.insert(name, value);
            }
            Record::SetAttrs { path, attrs: updates } => {
                let attrs = self
                    .attrs_mut(&path)
                    .ok_or_else(|| StorageError::NoSuchNode(path.clone()))?;
                attrs.extend(updates);
            }
            Record::Extend { path, offset, data } => {
                let array = self
                    .array_mut(&path)
                    .ok_or_else(|| StorageError::NoSuchNode(path.clone()))?;
                if array.data.len() as u64 != offset {
                    return Err(StorageError::Corrupt(format!(
                        "extend of {} at offset {} but array holds {} elements",
                        path,
                        offset,
                        array.data.len()
                    )));
                }
                let expected = array.data.dtype();
                let actual = data.dtype();
                if !array.data.append(data) {
                    return Err(StorageError::DTypeMismatch {
                        path,
                        expected,
                        actual: actual.to_string(),
                    });
                }
                array.chunks += 1;
            }
        }
        Ok(())
    }

    fn parent_mut(&mut self, path: &str) -> StorageResult<(&mut Group, String)> {
        let segments = split(path);
        let (name, parent) = segments
            .split_last()
            .ok_or_else(|| StorageError::AlreadyExists("/".to_string()))?;
        let name = name.to_string();
        let group = find_group_mut(&mut self.root, parent)
            .ok_or_else(|| StorageError::NoSuchNode(parent.join("/")))?;
        Ok((group, name))
    }

    fn attrs_mut(&mut self, path: &str) -> Option<&mut Attributes> {
        let segments = split(path);
        match segments.split_last() {
            None => Some(&mut self.root.attrs),
            Some((name, parent)) => {
                let group = find_group_mut(&mut self.root, parent)?;
                match group.children.get_mut(*name)? {
                    Node::Group(g) => Some(&mut g.attrs),
                    Node::Array(a) => Some(&mut a.attrs),
                }
            }
        }
    }

    fn array_mut(&mut self, path: &str) -> Option<&mut Array> {
        let segments = split(path);
        let (name, parent) = segments.split_last()?;
        match find_group_mut(&mut self.root, parent)?.children.get_mut(*name)? {
            Node::Array(a) => Some(a),
            Node::Group(_) => None,
        }
    }

    /// Validate and apply a record, then append it to the file
    fn commit(&mut self, record: Record) -> StorageResult<()> {
        if self.writer.is_none() {
            return Err(StorageError::ReadOnly(self.path.display().to_string()));
        }
        let payload = record.encode()?;
        format::check_payload_len(record.path(), payload.len())?;
        let kind = record.kind();
        self.apply(record)?;

        let frame = format::encode_frame(&payload);
        if let Some(writer) = self.writer.as_mut() {
            writer.write_all(&frame)?;
        }
        self.end_offset += frame.len() as u64;
        self.records += 1;
        debug!(kind, bytes = frame.len(), "appended record");
        Ok(())
    }

    /// Create a group at `path`; its parent must exist
    pub fn create_group(&mut self, path: &str) -> StorageResult<()> {
        self.commit(Record::CreateGroup {
            path: path.to_string(),
        })
    }

    /// Create an empty resizable array at `path`
    pub fn create_array(&mut self, path: &str, dtype: DType, chunk_len: u64) -> StorageResult<()> {
        self.commit(Record::CreateArray {
            path: path.to_string(),
            dtype,
            chunk_len,
        })
    }

    /// Set an attribute on the group or array at `path`
    pub fn set_attr(&mut self, path: &str, name: &str, value: Value) -> StorageResult<()> {
        self.commit(Record::SetAttr {
            path: path.to_string(),
            name: name.to_string(),
            value,
        })
    }

    /// Set several attributes on the node at `path` with one record
    pub fn set_attrs<'a>(
        &mut self,
        path: &str,
        attrs: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> StorageResult<()> {
        self.commit(Record::SetAttrs {
            path: path.to_string(),
            attrs: attrs
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        })
    }

    /// Append `data` to the array at `path`, returning the new length
    pub fn extend_array(&mut self, path: &str, data: ArrayData) -> StorageResult<u64> {
        let offset = self
            .array(path)
            .ok_or_else(|| StorageError::NoSuchNode(path.to_string()))?
            .len() as u64;
        let added = data.len() as u64;
        self.commit(Record::Extend {
            path: path.to_string(),
            offset,
            data,
        })?;
        Ok(offset + added)
    }

    /// Flush buffered records and sync them to disk
    pub fn flush(&mut self) -> StorageResult<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
            writer.get_ref().sync_data()?;
        }
        Ok(())
    }

    /// Flush and release the file
    pub fn close(mut self) -> StorageResult<()> {
        self.flush()
    }

    /// Root group
    pub fn root(&self) -> &Group {
        &self.root
    }

    /// Group at `path`
    pub fn group(&self, path: &str) -> Option<&Group> {
        find_group(&self.root, &split(path))
    }

    /// Array at `path`
    pub fn array(&self, path: &str) -> Option<&Array> {
        let segments = split(path);
        let (name, parent) = segments.split_last()?;
        match find_group(&self.root, parent)?.children.get(*name)? {
            Node::Array(a) => Some(a),
            Node::Group(_) => None,
        }
    }

    /// Attributes of the group or array at `path`
    pub fn attrs(&self, path: &str) -> Option<&Attributes> {
        let segments = split(path);
        match segments.split_last() {
            None => Some(&self.root.attrs),
            Some((name, parent)) => match find_group(&self.root, parent)?.children.get(*name)? {
                Node::Group(g) => Some(&g.attrs),
                Node::Array(a) => Some(&a.attrs),
            },
        }
    }

    /// Single attribute lookup
    pub fn attr(&self, path: &str, name: &str) -> Option<&Value> {
        self.attrs(path)?.get(name)
    }

    /// File backing this container
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Access mode the container was opened with
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Check if mutations are allowed
    pub fn is_writable(&self) -> bool {
        self.writer.is_some()
    }

    /// Number of records applied so far
    pub fn record_count(&self) -> u64 {
        self.records
    }
}
