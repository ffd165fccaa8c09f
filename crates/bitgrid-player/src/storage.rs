use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

/// An open file on the player's storage. Dropping it closes it.
pub trait StorageFile: Read + Seek {
    /// Current length of the file in bytes.
    fn size(&self) -> io::Result<u64>;
}

/// Block storage the player reads playlists and animations from.
pub trait Storage {
    fn open(&self, path: &str) -> io::Result<Box<dyn StorageFile>>;

    fn read_to_string(&self, path: &str) -> io::Result<String> {
        let mut file = self.open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Ok(contents)
    }
}

/// Storage rooted at a local directory (stands in for the SD card root).
#[derive(Debug, Clone)]
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a storage path (`/anims/a.bin` or `anims/a.bin`) onto the root directory.
    pub fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let rel = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.root.clone();
        for component in rel.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("path escapes storage root: {path}"),
                    ));
                }
            }
        }
        if resolved == self.root {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty storage path",
            ));
        }
        Ok(resolved)
    }
}

impl Storage for DirStorage {
    fn open(&self, path: &str) -> io::Result<Box<dyn StorageFile>> {
        let resolved = self.resolve(path)?;
        let file = File::open(&resolved)?;
        if !file.metadata()?.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a file: {}", resolved.display()),
            ));
        }
        Ok(Box::new(DiskFile { file }))
    }
}

struct DiskFile {
    file: File,
}

impl Read for DiskFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for DiskFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl StorageFile for DiskFile {
    fn size(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}
