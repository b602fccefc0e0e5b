use std::fs::File;
use std::io::Read;
use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::error::Result;
use crate::models::PackageData;

/// Size and lowercase hex digests of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksums {
    pub size: u64,
    pub sha1: String,
    pub md5: String,
    pub sha256: String,
    pub sha512: String,
}

impl Checksums {
    /// Hash a file in one streaming pass.
    pub fn of_file(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut sha1 = Sha1::new();
        let mut md5 = Md5::new();
        let mut sha256 = Sha256::new();
        let mut sha512 = Sha512::new();
        let mut size = 0u64;
        let mut buffer = vec![0; 8192];

        loop {
            let n = file.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            let chunk = &buffer[..n];
            sha1.update(chunk);
            md5.update(chunk);
            sha256.update(chunk);
            sha512.update(chunk);
            size += n as u64;
        }

        Ok(Self {
            size,
            sha1: hex::encode(sha1.finalize()),
            md5: hex::encode(md5.finalize()),
            sha256: hex::encode(sha256.finalize()),
            sha512: hex::encode(sha512.finalize()),
        })
    }

    pub fn apply_to(self, data: &mut PackageData) {
        data.size = Some(self.size);
        data.sha1 = Some(self.sha1);
        data.md5 = Some(self.md5);
        data.sha256 = Some(self.sha256);
        data.sha512 = Some(self.sha512);
    }
}
