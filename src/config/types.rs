use reelhouse_media::ResourceMode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// How long a stream request may wait for an I/O slot before it is
    /// turned away with 503
    #[serde(default = "default_admission_timeout")]
    pub admission_timeout_secs: u64,

    /// How long in-flight requests get to finish after a shutdown signal
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8081
}
fn default_admission_timeout() -> u64 {
    5
}
fn default_shutdown_grace() -> u64 {
    15
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            admission_timeout_secs: default_admission_timeout(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    #[serde(default)]
    pub mode: ResourceMode,

    #[serde(default = "default_buffer_size")]
    pub buffer_size: ByteSize,

    /// Slot count for volumes built from bare paths
    #[serde(default = "default_max_io")]
    pub max_io: usize,

    #[serde(default = "default_rescan_interval")]
    pub rescan_interval_secs: u64,

    #[serde(default)]
    pub volumes: Vec<VolumeConfig>,
}

fn default_buffer_size() -> ByteSize {
    ByteSize(10 * 1024 * 1024)
}
fn default_max_io() -> usize {
    10
}
fn default_rescan_interval() -> u64 {
    300
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            mode: ResourceMode::default(),
            buffer_size: default_buffer_size(),
            max_io: default_max_io(),
            rescan_interval_secs: default_rescan_interval(),
            volumes: Vec::new(),
        }
    }
}

/// A group of root directories sharing one id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VolumeConfig {
    /// Generated when left empty
    #[serde(default)]
    pub id: String,

    #[serde(default = "default_max_io")]
    pub max_io: usize,

    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

/// A byte count written the human way: `10MB`, `512 kb`, `1.5GB`, `4096`.
///
/// Units are powers of 1024 and case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ByteSize(pub u64);

const UNITS: [(&str, u64); 4] = [
    ("GB", 1024 * 1024 * 1024),
    ("MB", 1024 * 1024),
    ("KB", 1024),
    ("B", 1),
];

impl ByteSize {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl FromStr for ByteSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_uppercase();
        let split = s
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(s.len());
        let (number, unit) = s.split_at(split);
        let unit = unit.trim();

        if number.is_empty() {
            return Err(format!("invalid byte size {s:?}: missing number"));
        }

        if unit.is_empty() {
            return number
                .parse::<u64>()
                .map(ByteSize)
                .map_err(|e| format!("invalid byte size {s:?}: {e}"));
        }

        let multiplier = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, m)| *m)
            .ok_or_else(|| format!("unknown unit {unit:?} (expected B, KB, MB, GB)"))?;

        let value: f64 = number
            .parse()
            .map_err(|e| format!("invalid number in byte size {s:?}: {e}"))?;
        let bytes = value * multiplier as f64;
        if !bytes.is_finite() || bytes > u64::MAX as f64 {
            return Err(format!("byte size {s:?} is too large"));
        }
        Ok(ByteSize(bytes as u64))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, multiplier) in UNITS {
            if self.0 != 0 && self.0 % multiplier == 0 {
                return write!(f, "{}{}", self.0 / multiplier, name);
            }
        }
        write!(f, "{}B", self.0)
    }
}

impl Serialize for ByteSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bytes(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bytes(n) => Ok(ByteSize(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// A `--mount ID:LIMIT:PATH,PATH` command line argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountArg(pub VolumeConfig);

impl FromStr for MountArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = value.splitn(3, ':').collect();
        let [id, limit, paths] = parts[..] else {
            return Err("invalid format, expected 'ID:LIMIT:PATH,PATH'".to_string());
        };

        let max_io = limit
            .trim()
            .parse::<usize>()
            .map_err(|e| format!("invalid limit {limit:?}: {e}"))?;

        let paths: Vec<PathBuf> = paths
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect();

        Ok(MountArg(VolumeConfig {
            id: id.trim().to_string(),
            max_io,
            paths,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_size_parsing() {
        assert_eq!("10MB".parse::<ByteSize>().unwrap(), ByteSize(10 * 1024 * 1024));
        assert_eq!("512kb".parse::<ByteSize>().unwrap(), ByteSize(512 * 1024));
        assert_eq!(" 2 GB ".parse::<ByteSize>().unwrap(), ByteSize(2 * 1024 * 1024 * 1024));
        assert_eq!("1.5KB".parse::<ByteSize>().unwrap(), ByteSize(1536));
        assert_eq!("4096".parse::<ByteSize>().unwrap(), ByteSize(4096));
        assert_eq!("7B".parse::<ByteSize>().unwrap(), ByteSize(7));
    }

    #[test]
    fn test_byte_size_rejects_garbage() {
        assert!("".parse::<ByteSize>().is_err());
        assert!("MB".parse::<ByteSize>().is_err());
        assert!("10TB".parse::<ByteSize>().is_err());
        assert!("1.2.3MB".parse::<ByteSize>().is_err());
        assert!("-5MB".parse::<ByteSize>().is_err());
    }

    #[test]
    fn test_byte_size_display() {
        assert_eq!(ByteSize(10 * 1024 * 1024).to_string(), "10MB");
        assert_eq!(ByteSize(1536).to_string(), "1536B");
        assert_eq!(ByteSize(0).to_string(), "0B");
    }

    #[test]
    fn test_byte_size_from_toml_string_or_integer() {
        #[derive(Deserialize)]
        struct Wrapper {
            size: ByteSize,
        }
        let w: Wrapper = toml::from_str(r#"size = "1MB""#).unwrap();
        assert_eq!(w.size, ByteSize(1024 * 1024));
        let w: Wrapper = toml::from_str("size = 2048").unwrap();
        assert_eq!(w.size, ByteSize(2048));
    }

    #[test]
    fn test_mount_arg() {
        let MountArg(vol) = "disk1:4:/mnt/a, /mnt/b,".parse().unwrap();
        assert_eq!(vol.id, "disk1");
        assert_eq!(vol.max_io, 4);
        assert_eq!(vol.paths, vec![PathBuf::from("/mnt/a"), PathBuf::from("/mnt/b")]);
    }

    #[test]
    fn test_mount_arg_errors() {
        assert!("disk1:/mnt/a".parse::<MountArg>().is_err());
        assert!("disk1:many:/mnt/a".parse::<MountArg>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.media.mode, ResourceMode::Buffered);
        assert_eq!(config.media.buffer_size, ByteSize(10 * 1024 * 1024));
        assert_eq!(config.media.max_io, 10);
        assert_eq!(config.media.rescan_interval_secs, 300);
    }
}
