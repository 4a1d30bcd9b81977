#![allow(dead_code)]

use std::io::Write;

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes256, Block};
use flate2::{write::ZlibEncoder, Compression};
use hzs_pak::{types::PAK_MAGIC, AesKey};

/// How a record is written to the encoded-entries table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    Compact,
    Full,
}

/// Builds pak files in memory
pub struct PakBuilder {
    key: Option<AesKey>,
    body: Vec<u8>,
    encoded: Vec<u8>,
    directories: Vec<(String, Vec<(String, i32)>)>,
    methods: Vec<&'static str>,
    with_directory: bool,
    break_directory_after: Option<usize>,
}

fn encrypt(key: &AesKey, data: &[u8]) -> Vec<u8> {
    let cipher = Aes256::new(&key.0.into());
    let mut out = data.to_vec();
    out.resize(data.len().next_multiple_of(16), 0);
    for chunk in out.chunks_exact_mut(16) {
        cipher.encrypt_block(Block::from_mut_slice(chunk));
    }
    out
}

fn push_fstring(out: &mut Vec<u8>, value: &str) {
    out.extend((value.len() as i32 + 1).to_le_bytes());
    out.extend(value.as_bytes());
    out.push(0);
}

fn push_sized(out: &mut Vec<u8>, value: u64, narrow: bool) {
    if narrow {
        out.extend((value as u32).to_le_bytes());
    } else {
        out.extend(value.to_le_bytes());
    }
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

impl PakBuilder {
    pub fn new() -> Self {
        Self {
            key: None,
            // keep every body offset above zero
            body: vec![0u8; 16],
            encoded: Vec::new(),
            directories: Vec::new(),
            methods: vec!["Zlib", "Oodle"],
            with_directory: true,
            break_directory_after: None,
        }
    }

    pub fn encrypted(key: AesKey) -> Self {
        Self {
            key: Some(key),
            ..Self::new()
        }
    }

    /// Replace the compression method names written to the footer.
    pub fn with_methods(mut self, methods: Vec<&'static str>) -> Self {
        self.methods = methods;
        self
    }

    pub fn without_directory(mut self) -> Self {
        self.with_directory = false;
        self
    }

    /// Replace the name of the file after the first `files` with an oversized length.
    pub fn break_directory_after(mut self, files: usize) -> Self {
        self.break_directory_after = Some(files);
        self
    }

    /// List `dir` + `name` with the given record offset, without adding a record.
    pub fn list(&mut self, dir: &str, name: &str, record: i32) {
        match self.directories.iter_mut().find(|(d, _)| d == dir) {
            Some((_, files)) => files.push((name.to_owned(), record)),
            None => self
                .directories
                .push((dir.to_owned(), vec![(name.to_owned(), record)])),
        }
    }

    /// Add a raw record to the table and list it under `dir` + `name`.
    pub fn add_record(&mut self, dir: &str, name: &str, record: &[u8]) {
        let offset = self.encoded.len() as i32;
        self.encoded.extend(record);
        self.list(dir, name, offset);
    }

    fn key_for(&self, encrypted: bool) -> Option<AesKey> {
        if encrypted {
            Some(self.key.expect("encrypted entries need an encrypted builder"))
        } else {
            None
        }
    }

    pub fn add_stored(&mut self, dir: &str, name: &str, data: &[u8], encrypted: bool, record: Record) {
        let offset = self.body.len() as u64;
        let stored = match self.key_for(encrypted) {
            Some(key) => encrypt(&key, data),
            None => data.to_vec(),
        };
        self.body.extend(&stored);

        let size = data.len() as u64;
        let mut out = Vec::new();
        match record {
            Record::Full => {
                out.extend(0x3Fu32.to_le_bytes());
                out.extend(offset.to_le_bytes());
                out.extend(size.to_le_bytes());
                out.extend(size.to_le_bytes());
                out.extend(0u32.to_le_bytes());
                out.extend([0u8; 20]);
                out.push(encrypted as u8);
                out.extend(0u32.to_le_bytes());
            }
            Record::Compact => {
                let mut flags = 0xC000_0000u32;
                if encrypted {
                    flags |= 1 << 6;
                }
                out.extend(flags.to_le_bytes());
                out.extend((offset as u32).to_le_bytes());
                out.extend((size as u32).to_le_bytes());
            }
        }
        self.add_record(dir, name, &out);
    }

    /// Add a file zlib compressed in `block_size` chunks, recorded with method `method`.
    pub fn add_compressed(
        &mut self,
        dir: &str,
        name: &str,
        data: &[u8],
        block_size: u32,
        method: u32,
        encrypted: bool,
        record: Record,
    ) {
        let key = self.key_for(encrypted);
        let blocks = data
            .chunks(block_size as usize)
            .map(|chunk| {
                let packed = zlib(chunk);
                match key {
                    Some(key) => encrypt(&key, &packed),
                    None => packed,
                }
            })
            .collect::<Vec<_>>();

        let header_len = 53 + 16 * blocks.len() as u64;
        let mut ranges = Vec::new();
        let mut cursor = header_len;
        for block in &blocks {
            ranges.push((cursor, cursor + block.len() as u64));
            cursor += block.len() as u64;
        }
        let size = cursor;
        let uncompressed = data.len() as u64;

        let offset = self.body.len() as u64;
        self.body.extend(0u64.to_le_bytes());
        self.body.extend((size - header_len).to_le_bytes());
        self.body.extend(uncompressed.to_le_bytes());
        self.body.extend(method.to_le_bytes());
        self.body.extend([0u8; 20]);
        self.body.push(encrypted as u8);
        self.body.extend(block_size.to_le_bytes());
        for (start, end) in &ranges {
            self.body.extend(start.to_le_bytes());
            self.body.extend(end.to_le_bytes());
        }
        for block in &blocks {
            self.body.extend(block);
        }

        let count = (blocks.len() as u32) << 7;
        let mut out = Vec::new();
        match record {
            Record::Full => {
                out.extend((0x3F | count).to_le_bytes());
                out.extend(offset.to_le_bytes());
                out.extend(size.to_le_bytes());
                out.extend(uncompressed.to_le_bytes());
                out.extend(method.to_le_bytes());
                out.extend([0u8; 20]);
                out.push(encrypted as u8);
                out.extend(block_size.to_le_bytes());
                for (start, end) in &ranges {
                    out.extend(start.to_le_bytes());
                    out.extend(end.to_le_bytes());
                }
            }
            Record::Compact => {
                let narrow_offset = offset <= u32::MAX as u64;
                let narrow_uncompressed = uncompressed <= u32::MAX as u64;
                let narrow_size = size <= u32::MAX as u64;
                let mut flags = method | count;
                if encrypted {
                    flags |= 1 << 6;
                }
                if narrow_size {
                    flags |= 1 << 29;
                }
                if narrow_uncompressed {
                    flags |= 1 << 30;
                }
                if narrow_offset {
                    flags |= 1 << 31;
                }
                out.extend(flags.to_le_bytes());
                push_sized(&mut out, offset, narrow_offset);
                push_sized(&mut out, uncompressed, narrow_uncompressed);
                push_sized(&mut out, size, narrow_size);
                out.extend(block_size.to_le_bytes());
                for (start, end) in &ranges {
                    out.extend((*start as u32).to_le_bytes());
                    out.extend((*end as u32).to_le_bytes());
                }
            }
        }
        self.add_record(dir, name, &out);
    }

    fn seal(&self, data: Vec<u8>) -> Vec<u8> {
        match self.key {
            Some(key) => encrypt(&key, &data),
            None => data,
        }
    }

    fn directory_block(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut written = 0;
        out.extend((self.directories.len() as i32).to_le_bytes());
        for (dir, files) in &self.directories {
            push_fstring(&mut out, dir);
            out.extend((files.len() as i32).to_le_bytes());
            for (name, record) in files {
                if self.break_directory_after == Some(written) {
                    out.extend(0x0FFF_FFFFi32.to_le_bytes());
                    out.extend(name.as_bytes());
                    return out;
                }
                push_fstring(&mut out, name);
                out.extend(record.to_le_bytes());
                written += 1;
            }
        }
        out
    }

    pub fn file_count(&self) -> usize {
        self.directories.iter().map(|(_, files)| files.len()).sum()
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = self.body.clone();

        let directory = self.seal(self.directory_block());
        let directory_offset = out.len() as i64;
        out.extend(&directory);

        let mut index = Vec::new();
        push_fstring(&mut index, "../../../");
        index.extend((self.file_count() as i32).to_le_bytes());
        index.extend(0x1234_5678u64.to_le_bytes());
        index.extend(0i32.to_le_bytes());
        if self.with_directory {
            index.extend(1i32.to_le_bytes());
            index.extend(directory_offset.to_le_bytes());
            index.extend((directory.len() as i64).to_le_bytes());
            index.extend([0u8; 20]);
        } else {
            index.extend(0i32.to_le_bytes());
        }
        index.extend((self.encoded.len() as i32).to_le_bytes());
        index.extend(&self.encoded);
        let index = self.seal(index);

        let index_offset = out.len() as u64;
        out.extend(&index);

        let footer_start = out.len();
        out.extend(PAK_MAGIC.to_le_bytes());
        out.extend(11u32.to_le_bytes());
        out.extend(index_offset.to_le_bytes());
        out.extend((index.len() as u64).to_le_bytes());
        out.extend([0u8; 20]);
        out.push(self.key.is_some() as u8);
        out.extend([0u8; 16]);
        out.extend((self.methods.len() as u32).to_le_bytes());
        for method in &self.methods {
            let mut name = [0u8; 32];
            name[..method.len()].copy_from_slice(method.as_bytes());
            out.extend(name);
        }
        out.resize(footer_start + 204, 0);

        out
    }
}

/// Repeating, poorly compressible test data
pub fn sample(len: usize) -> Vec<u8> {
    let mut state = 0x2545_F491u32;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state % 64) as u8 + b'0'
        })
        .collect()
}
