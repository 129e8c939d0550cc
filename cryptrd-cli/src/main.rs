// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

use cryptrd_crypto as crypto;
use cryptrd_storage as storage;
use cryptrd_utils_sync as utils_sync;

use crypto::symcipher::SymBlockCipherFamily;
use storage::{
    DeviceId, DispatchStrategy, IoCompletion, IoDirection, IoRequest, RamdiskConfig, RamdiskDeviceConfig,
    RamdiskRegistry,
};
use utils_sync::std_sync_types::StdSyncTypes;

use clap::{self, Parser as _};
use std::{
    fs,
    io::{self, Read, Write},
    path::PathBuf,
    thread, time,
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

type Registry = RamdiskRegistry<StdSyncTypes>;

fn cli_parse_size(arg: &str) -> Result<u64, clap::error::Error> {
    let arg = arg.trim_start();
    let unit_pos = arg.char_indices().find(|(_pos, c)| !c.is_ascii_digit());
    let (value, unit) = match unit_pos {
        Some((unit_pos, _)) => {
            let unit = &arg[unit_pos..].trim();
            if unit.is_empty() || *unit == "B" {
                (&arg[..unit_pos], 1u64)
            } else if *unit == "K" {
                (&arg[..unit_pos], 1024u64)
            } else if *unit == "M" {
                (&arg[..unit_pos], 1024u64 * 1024)
            } else {
                return Err(clap::Error::raw(
                    clap::error::ErrorKind::ValueValidation,
                    "unrecognized unit, possible values: none|B, K, M",
                ));
            }
        }
        None => (arg.trim_end(), 1),
    };

    let value = match value.parse::<u64>() {
        Ok(value) => value,
        Err(_) => {
            return Err(clap::Error::raw(
                clap::error::ErrorKind::ValueValidation,
                "invalid size value",
            ));
        }
    };

    value
        .checked_mul(unit)
        .ok_or_else(|| clap::Error::raw(clap::error::ErrorKind::ValueValidation, "value too large"))
}

fn cli_parse_sector_size(arg: &str) -> Result<u32, clap::error::Error> {
    let size = cli_parse_size(arg)?;
    if size == 0 {
        return Err(clap::Error::raw(
            clap::error::ErrorKind::ValueValidation,
            "sector size must not be zero",
        ));
    }
    u32::try_from(size).map_err(|_| clap::Error::raw(clap::error::ErrorKind::ValueValidation, "value too large"))
}

fn cli_parse_duration(arg: &str) -> Result<time::Duration, clap::error::Error> {
    let arg = arg.trim();
    let unit_pos = arg.char_indices().find(|(_pos, c)| !c.is_ascii_digit());
    let (value, unit) = match unit_pos {
        Some((unit_pos, _)) => (&arg[..unit_pos], arg[unit_pos..].trim()),
        None => (arg, "s"),
    };

    let value = value
        .parse::<u64>()
        .map_err(|_| clap::Error::raw(clap::error::ErrorKind::ValueValidation, "invalid duration value"))?;
    match unit {
        "ms" => Ok(time::Duration::from_millis(value)),
        "s" => Ok(time::Duration::from_secs(value)),
        "m" => value
            .checked_mul(60)
            .map(time::Duration::from_secs)
            .ok_or_else(|| clap::Error::raw(clap::error::ErrorKind::ValueValidation, "value too large")),
        _ => Err(clap::Error::raw(
            clap::error::ErrorKind::ValueValidation,
            "unrecognized unit, possible values: ms, none|s, m",
        )),
    }
}

fn cli_parse_hexstr(arg: &str) -> Result<Zeroizing<Vec<u8>>, clap::error::Error> {
    fn nibble_from_hex(hexchar: u8) -> Result<u8, clap::error::Error> {
        Ok(hexchar
            - match hexchar {
                b'0'..=b'9' => b'0',
                b'a'..=b'f' => b'a' - 0xa,
                b'A'..=b'F' => b'A' - 0xa,
                _ => {
                    return Err(clap::Error::raw(
                        clap::error::ErrorKind::ValueValidation,
                        "invalid digit in hexadecimal string",
                    ));
                }
            })
    }

    let arg = arg.trim().as_bytes();
    let mut result = Zeroizing::new(Vec::with_capacity(arg.len().div_ceil(2)));
    let src = if arg.len() % 2 != 0 {
        // Pad with a zero nibble at the head.
        result.push(nibble_from_hex(arg[0])?);
        &arg[1..]
    } else {
        arg
    };

    for hexdigit_pair in src.chunks_exact(2) {
        let mut byte = 0u8;
        for hexchar in hexdigit_pair {
            byte = byte << 4 | nibble_from_hex(*hexchar)?;
        }
        result.push(byte);
    }

    Ok(result)
}

#[derive(clap::Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: CliRamdiskConfig,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Show the devices' parameters.
    Info,

    /// Write data to a device, read it back and verify.
    Roundtrip(CliRoundtripArgs),

    /// Close a device and wait for its idle timer to simulate a media change.
    ///
    /// Data written before is gone after the next open.
    Idle(CliIdleArgs),

    /// Write the same data through each request dispatch strategy.
    ///
    /// The read back data and the ciphertext at rest are expected to be
    /// identical for all strategies.
    CompareStrategies(CliCompareStrategiesArgs),
}

#[derive(clap::Args)]
struct CliRamdiskConfig {
    /// Device sector size [default: 512B].
    ///
    /// Must be a multiple of the block cipher's block size if encryption is
    /// enabled.
    #[arg(name = "sector-size", long, value_name = "SIZE", value_parser = cli_parse_sector_size, global = true)]
    sector_size: Option<u32>,

    /// Device capacity in units of sectors [default: 2048].
    #[arg(name = "sectors", long, value_name = "COUNT", global = true)]
    sectors: Option<u64>,

    /// Number of devices [default: 4].
    #[arg(name = "devices", long, value_name = "COUNT", global = true)]
    devices: Option<usize>,

    /// Request dispatch mode: 0 for simple, 1 for full, 2 for direct-segment
    /// [default: 0].
    ///
    /// Unknown values fall back to simple.
    #[arg(
        name = "request-mode",
        short = 'm',
        long,
        value_name = "MODE",
        allow_negative_numbers = true,
        global = true
    )]
    request_mode: Option<i32>,

    /// Store data unencrypted.
    #[arg(name = "no-encrypt", long, global = true)]
    no_encrypt: bool,

    /// Block cipher algorithm to use for encryption [default: aes].
    ///
    /// The key size variant is selected by the key's length.
    #[arg(name = "cipher", short = 'C', long, value_name = "CIPHER", global = true)]
    block_cipher: Option<CliBlockCipher>,

    #[command(flatten)]
    key: CliKeySource,

    /// Delay after the last close until the media is considered changed
    /// [default: 30s].
    #[arg(name = "idle-delay", long, value_name = "DURATION", value_parser = cli_parse_duration, global = true)]
    idle_delay: Option<time::Duration>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CliBlockCipher {
    Aes,
    #[cfg(feature = "camellia")]
    Camellia,
    #[cfg(feature = "sm4")]
    Sm4,
}

impl From<CliBlockCipher> for SymBlockCipherFamily {
    fn from(value: CliBlockCipher) -> Self {
        match value {
            CliBlockCipher::Aes => Self::Aes,
            #[cfg(feature = "camellia")]
            CliBlockCipher::Camellia => Self::Camellia,
            #[cfg(feature = "sm4")]
            CliBlockCipher::Sm4 => Self::Sm4,
        }
    }
}

#[derive(clap::Args)]
#[group(required = false, multiple = false)]
struct CliKeySource {
    /// Encryption key provided as a string [default: built-in key].
    #[arg(name = "key", long, value_name = "STRING")]
    key: Option<String>,
    /// Encryption key provided as a hexadecimal string.
    #[arg(name = "key-hex", short = 'K', long, value_name = "HEX", value_parser = cli_parse_hexstr)]
    key_hex: Option<Zeroizing<Vec<u8>>>,
    /// File containing the encryption key.
    #[arg(name = "key-file", short = 'k', long, value_name = "FILE")]
    key_file_path: Option<PathBuf>,
}

#[derive(clap::Args)]
struct CliDeviceArgs {
    /// Index of the device to operate on.
    #[arg(name = "device", short, long, value_name = "INDEX", default_value_t = 0)]
    device: usize,
}

#[derive(clap::Args)]
struct CliRoundtripArgs {
    #[command(flatten)]
    device: CliDeviceArgs,

    /// First sector to write to.
    #[arg(name = "sector", short, long, value_name = "SECTOR", default_value_t = 0)]
    sector: u64,

    /// Input file providing the data to write [default: standard input].
    ///
    /// The data gets padded with zeroes to a multiple of the sector size.
    #[arg(name = "input-file", short, long, value_name = "FILE")]
    in_file_path: Option<PathBuf>,

    /// Split the data into request segments of the given size.
    ///
    /// Must be a multiple of the sector size.
    #[arg(name = "segment-size", long, value_name = "SIZE", value_parser = cli_parse_size)]
    segment_size: Option<u64>,

    /// Write the data as stored at rest to the given file.
    #[arg(name = "raw-output-file", short = 'o', long, value_name = "FILE")]
    raw_out_file_path: Option<PathBuf>,
}

#[derive(clap::Args)]
struct CliIdleArgs {
    #[command(flatten)]
    device: CliDeviceArgs,
}

#[derive(clap::Args)]
struct CliCompareStrategiesArgs {
    /// First sector to write to.
    #[arg(name = "sector", short, long, value_name = "SECTOR", default_value_t = 0)]
    sector: u64,

    /// Number of bytes of test data to write.
    #[arg(name = "length", short, long, value_name = "SIZE", value_parser = cli_parse_size, default_value = "4K")]
    length: u64,

    /// Byte value to fill the test data with.
    #[arg(name = "fill", long, value_name = "BYTE", default_value_t = 0xab)]
    fill: u8,
}

fn load_key(key_source: &CliKeySource) -> Option<Zeroizing<Vec<u8>>> {
    if let Some(key) = key_source.key.as_ref() {
        Some(Zeroizing::new(key.as_bytes().to_vec()))
    } else if let Some(key) = key_source.key_hex.as_ref() {
        Some(key.clone())
    } else if let Some(key_file_path) = key_source.key_file_path.as_ref() {
        match fs::read(key_file_path) {
            Ok(key) => Some(Zeroizing::new(key)),
            Err(e) => {
                eprintln!("error: failed to read key file: error={}", e);
                std::process::exit(4);
            }
        }
    } else {
        None
    }
}

fn cli_to_ramdisk_config(cli: &CliRamdiskConfig) -> RamdiskConfig {
    let mut config = RamdiskConfig::default();
    if let Some(sector_size) = cli.sector_size {
        config.sector_size = sector_size;
    }
    if let Some(sectors) = cli.sectors {
        config.sectors = sectors;
    }
    if let Some(devices) = cli.devices {
        config.devices = devices;
    }
    if let Some(request_mode) = cli.request_mode {
        config.request_mode = request_mode;
    }
    config.encrypt = !cli.no_encrypt;
    if let Some(block_cipher) = cli.block_cipher {
        config.cipher_family = block_cipher.into();
    }
    if let Some(key) = load_key(&cli.key) {
        config.key = key;
    }
    if let Some(idle_delay) = cli.idle_delay {
        config.idle_delay = idle_delay;
    }
    config
}

fn instantiate_registry(config: &RamdiskConfig) -> Registry {
    let registry = match Registry::new(config) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("error: invalid ramdisk configuration: error={}", e);
            std::process::exit(3);
        }
    };
    for (device_id, e) in registry.setup_failures() {
        eprintln!("warning: device {} not available: error={}", device_id, e);
    }
    registry
}

fn lookup_device(registry: &Registry, device_id: DeviceId) -> DeviceId {
    if let Err(e) = registry.device(device_id) {
        eprintln!("error: cannot access device {}: error={}", device_id, e);
        std::process::exit(5);
    }
    device_id
}

fn read_input(in_file_path: Option<&PathBuf>) -> Vec<u8> {
    let result = match in_file_path {
        Some(in_file_path) => fs::read(in_file_path),
        None => {
            let mut data = Vec::new();
            io::stdin().read_to_end(&mut data).map(|_| data)
        }
    };
    match result {
        Ok(data) => data,
        Err(e) => {
            eprintln!("error: failed to read input data: error={}", e);
            std::process::exit(4);
        }
    }
}

/// Split `len` bytes into segment lengths of at most `segment_size` each.
fn segment_lengths(len: usize, segment_size: usize) -> Vec<usize> {
    let mut lengths = Vec::new();
    let mut remaining = len;
    while remaining != 0 {
        let segment_len = remaining.min(segment_size);
        lengths.push(segment_len);
        remaining -= segment_len;
    }
    lengths
}

fn check_completions(completions: &[IoCompletion], what: &str) {
    for completion in completions.iter() {
        if let Err(e) = completion.status {
            eprintln!(
                "error: {} request failed: sectors_transferred={}, error={}",
                what, completion.sectors_transferred, e
            );
            std::process::exit(6);
        }
    }
}

fn write_segments(
    registry: &Registry,
    device_id: DeviceId,
    sector: u64,
    data: &[u8],
    segment_lengths: &[usize],
) -> Vec<IoCompletion> {
    let mut segments = Vec::with_capacity(segment_lengths.len());
    let mut data = data;
    for segment_len in segment_lengths.iter() {
        let (segment, rest) = data.split_at(*segment_len);
        segments.push(segment.to_vec());
        data = rest;
    }
    let completions =
        registry.submit_requests(device_id, [IoRequest::with_segments(1, IoDirection::Write, sector, segments)]);
    check_completions(&completions, "write");
    completions
}

fn read_segments(registry: &Registry, device_id: DeviceId, sector: u64, segment_lengths: &[usize]) -> Vec<u8> {
    let segments = segment_lengths
        .iter()
        .map(|segment_len| vec![0u8; *segment_len])
        .collect();
    let completions =
        registry.submit_requests(device_id, [IoRequest::with_segments(2, IoDirection::Read, sector, segments)]);
    check_completions(&completions, "read");
    completions
        .into_iter()
        .flat_map(|completion| completion.into_data())
        .collect()
}

fn read_raw(registry: &Registry, device_id: DeviceId, sector: u64, len: u64) -> Vec<u8> {
    let result = registry.device(device_id).and_then(|device| {
        let byte_offset = sector
            .checked_mul(device.sector_size() as u64)
            .unwrap_or(u64::MAX);
        device.read_raw(byte_offset, len)
    });
    match result {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("error: failed to read raw device contents: error={}", e);
            std::process::exit(6);
        }
    }
}

fn cmd_info(registry: &Registry) {
    for (device_id, device) in registry.devices() {
        let geometry = device.geometry();
        println!("{}:", device.name());
        println!("  index: {}", device_id);
        println!("  sector_size: {}", device.sector_size());
        println!("  sectors: {}", device.capacity_sectors());
        println!("  capacity_bytes: {}", device.capacity_bytes());
        println!("  kernel_sectors: {}", device.capacity_kernel_sectors());
        println!(
            "  geometry: cylinders={}, heads={}, sectors={}, start={}",
            geometry.cylinders, geometry.heads, geometry.sectors, geometry.start
        );
        println!("  strategy: {}", device.strategy());
    }
}

fn cmd_roundtrip(registry: &Registry, args: &CliRoundtripArgs) {
    let device_id = lookup_device(registry, DeviceId(args.device.device));
    let sector_size = match registry.device(device_id) {
        Ok(device) => device.sector_size() as usize,
        Err(_) => std::process::exit(5),
    };

    let mut data = read_input(args.in_file_path.as_ref());
    data.resize(data.len().next_multiple_of(sector_size), 0);
    if data.is_empty() {
        eprintln!("error: no input data");
        std::process::exit(3);
    }

    let segment_size = match args.segment_size {
        Some(segment_size) => match usize::try_from(segment_size) {
            Ok(segment_size) if segment_size != 0 && segment_size % sector_size == 0 => segment_size,
            _ => {
                eprintln!("error: segment size not a non-zero multiple of the sector size");
                std::process::exit(3);
            }
        },
        None => data.len(),
    };
    let segment_lengths = segment_lengths(data.len(), segment_size);

    if let Err(e) = registry.open(device_id) {
        eprintln!("error: failed to open device: error={}", e);
        std::process::exit(5);
    }
    let completions = write_segments(registry, device_id, args.sector, &data, &segment_lengths);
    info!(
        device = %device_id,
        bytes = data.len(),
        segments = segment_lengths.len(),
        completions = completions.len(),
        "data written"
    );
    let read_data = read_segments(registry, device_id, args.sector, &segment_lengths);
    let raw = read_raw(registry, device_id, args.sector, data.len() as u64);
    if let Err(e) = registry.close(device_id) {
        eprintln!("error: failed to close device: error={}", e);
        std::process::exit(5);
    }

    if read_data != data {
        eprintln!("error: data read back differs from data written");
        std::process::exit(6);
    }
    println!(
        "{} bytes at sector {} verified, {} write completion(s)",
        data.len(),
        args.sector,
        completions.len()
    );

    if let Some(raw_out_file_path) = args.raw_out_file_path.as_ref() {
        let result = fs::File::create(raw_out_file_path).and_then(|mut raw_out_file| raw_out_file.write_all(&raw));
        if let Err(e) = result {
            eprintln!("error: failed to write raw output file: error={}", e);
            std::process::exit(4);
        }
    }
}

fn cmd_idle(registry: &Registry, args: &CliIdleArgs) {
    let device_id = lookup_device(registry, DeviceId(args.device.device));
    let (sector_size, idle_delay) = match registry.device(device_id) {
        Ok(device) => (device.sector_size() as usize, device.config().idle_delay),
        Err(_) => std::process::exit(5),
    };

    if let Err(e) = registry.open(device_id) {
        eprintln!("error: failed to open device: error={}", e);
        std::process::exit(5);
    }
    let data = vec![0x5au8; sector_size];
    write_segments(registry, device_id, 0, &data, &[sector_size]);
    if let Err(e) = registry.close(device_id) {
        eprintln!("error: failed to close device: error={}", e);
        std::process::exit(5);
    }

    println!("device closed, waiting {:?} for the idle timer", idle_delay);
    let deadline = time::Instant::now() + idle_delay + time::Duration::from_secs(1);
    while !matches!(registry.get_media_changed(device_id), Ok(true)) {
        if time::Instant::now() >= deadline {
            eprintln!("error: idle timer didn't expire");
            std::process::exit(6);
        }
        thread::sleep(time::Duration::from_millis(10).min(idle_delay));
    }
    println!("media changed");

    if let Err(e) = registry.open(device_id) {
        eprintln!("error: failed to open device: error={}", e);
        std::process::exit(5);
    }
    let raw = read_raw(registry, device_id, 0, sector_size as u64);
    let _ = registry.close(device_id);
    if raw.iter().any(|b| *b != 0) {
        eprintln!("error: store not blank after revalidation");
        std::process::exit(6);
    }
    println!("media revalidated, store is blank");
}

fn cmd_compare_strategies(config: &RamdiskConfig, args: &CliCompareStrategiesArgs) {
    let cipher = match config.validate().and_then(|_| config.instantiate_cipher()) {
        Ok(cipher) => cipher,
        Err(e) => {
            eprintln!("error: invalid ramdisk configuration: error={}", e);
            std::process::exit(3);
        }
    };

    let strategies = [
        DispatchStrategy::Simple,
        DispatchStrategy::Full,
        DispatchStrategy::DirectSegment,
    ];
    let device_configs: Vec<RamdiskDeviceConfig> = strategies
        .iter()
        .map(|strategy| RamdiskDeviceConfig {
            sector_size: config.sector_size,
            sectors: config.sectors,
            strategy: *strategy,
            idle_delay: config.idle_delay,
        })
        .collect();
    let registry = Registry::with_device_configs(cipher, &device_configs);
    if let Some((device_id, e)) = registry.setup_failures().first() {
        eprintln!("error: failed to set up device {}: error={}", device_id, e);
        std::process::exit(5);
    }

    let sector_size = config.sector_size as usize;
    let len = match usize::try_from(args.length) {
        Ok(len) if len != 0 && len % sector_size == 0 => len,
        _ => {
            eprintln!("error: length not a non-zero multiple of the sector size");
            std::process::exit(3);
        }
    };
    let data = vec![args.fill; len];
    // Two segments, if possible, so that the strategies' decompositions differ.
    let segment_lengths = if len > sector_size {
        vec![sector_size, len - sector_size]
    } else {
        vec![len]
    };

    let mut reference_raw: Option<Vec<u8>> = None;
    for (device_id, strategy) in strategies.iter().enumerate() {
        let device_id = DeviceId(device_id);
        let completions = write_segments(&registry, device_id, args.sector, &data, &segment_lengths);
        let read_data = read_segments(&registry, device_id, args.sector, &segment_lengths);
        let raw = read_raw(&registry, device_id, args.sector, len as u64);

        let read_ok = read_data == data;
        let raw_ok = reference_raw.as_ref().map(|reference| *reference == raw).unwrap_or(true);
        println!(
            "{}: {} write completion(s), read back {}, at rest {}",
            strategy,
            completions.len(),
            if read_ok { "ok" } else { "MISMATCH" },
            if raw_ok { "identical" } else { "DIFFERENT" }
        );
        if !read_ok || !raw_ok {
            std::process::exit(6);
        }
        if reference_raw.is_none() {
            reference_raw = Some(raw);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli_to_ramdisk_config(&cli.config);

    match &cli.command {
        CliCommand::Info => {
            let registry = instantiate_registry(&config);
            cmd_info(&registry);
        }
        CliCommand::Roundtrip(args) => {
            let registry = instantiate_registry(&config);
            cmd_roundtrip(&registry, args);
        }
        CliCommand::Idle(args) => {
            let registry = instantiate_registry(&config);
            cmd_idle(&registry, args);
        }
        CliCommand::CompareStrategies(args) => {
            cmd_compare_strategies(&config, args);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::{CommandFactory as _, Parser as _};

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parse_size() {
        assert_eq!(cli_parse_size("512").unwrap(), 512);
        assert_eq!(cli_parse_size("512B").unwrap(), 512);
        assert_eq!(cli_parse_size(" 4K").unwrap(), 4096);
        assert_eq!(cli_parse_size("2M").unwrap(), 2 * 1024 * 1024);
        assert!(cli_parse_size("4T").is_err());
        assert!(cli_parse_size("K").is_err());
        assert!(cli_parse_size("18446744073709551615K").is_err());
    }

    #[test]
    fn test_cli_parse_sector_size() {
        assert_eq!(cli_parse_sector_size("4K").unwrap(), 4096);
        assert!(cli_parse_sector_size("0").is_err());
        assert!(cli_parse_sector_size("8M").is_ok());
        assert!(cli_parse_sector_size("4194304K").is_err());
    }

    #[test]
    fn test_cli_parse_duration() {
        assert_eq!(cli_parse_duration("30").unwrap(), time::Duration::from_secs(30));
        assert_eq!(cli_parse_duration("30s").unwrap(), time::Duration::from_secs(30));
        assert_eq!(cli_parse_duration("250ms").unwrap(), time::Duration::from_millis(250));
        assert_eq!(cli_parse_duration("2m").unwrap(), time::Duration::from_secs(120));
        assert!(cli_parse_duration("2h").is_err());
        assert!(cli_parse_duration("ms").is_err());
    }

    #[test]
    fn test_cli_parse_hexstr() {
        assert_eq!(&cli_parse_hexstr("00ff10Ab").unwrap()[..], &[0x00, 0xff, 0x10, 0xab]);
        // Odd lengths get a zero nibble prepended.
        assert_eq!(&cli_parse_hexstr("abc").unwrap()[..], &[0x0a, 0xbc]);
        assert!(cli_parse_hexstr("").unwrap().is_empty());
        assert!(cli_parse_hexstr("0g").is_err());
    }

    #[test]
    fn test_segment_lengths() {
        assert_eq!(segment_lengths(4096, 1024), vec![1024; 4]);
        assert_eq!(segment_lengths(2560, 1024), vec![1024, 1024, 512]);
        assert_eq!(segment_lengths(512, 4096), vec![512]);
        assert!(segment_lengths(0, 512).is_empty());
    }

    #[test]
    fn test_cli_to_ramdisk_config() {
        let cli = Cli::try_parse_from(["cryptrd-cli", "info"]).unwrap();
        let config = cli_to_ramdisk_config(&cli.config);
        let default_config = RamdiskConfig::default();
        assert_eq!(config.sector_size, default_config.sector_size);
        assert_eq!(config.sectors, default_config.sectors);
        assert_eq!(config.devices, default_config.devices);
        assert_eq!(config.request_mode, default_config.request_mode);
        assert!(config.encrypt);
        assert_eq!(&config.key[..], &default_config.key[..]);

        let cli = Cli::try_parse_from([
            "cryptrd-cli",
            "--sector-size",
            "4K",
            "--sectors",
            "16",
            "--devices",
            "2",
            "--request-mode",
            "-1",
            "-K",
            "000102030405060708090a0b0c0d0e0f",
            "--idle-delay",
            "100ms",
            "info",
        ])
        .unwrap();
        let config = cli_to_ramdisk_config(&cli.config);
        assert_eq!(config.sector_size, 4096);
        assert_eq!(config.sectors, 16);
        assert_eq!(config.devices, 2);
        assert_eq!(config.request_mode, -1);
        assert_eq!(config.dispatch_strategy(), DispatchStrategy::Simple);
        assert_eq!(config.key.len(), 16);
        assert_eq!(config.idle_delay, time::Duration::from_millis(100));
        assert_eq!(config.validate(), Ok(()));

        // Global options may follow the subcommand.
        let cli = Cli::try_parse_from(["cryptrd-cli", "roundtrip", "--no-encrypt", "-m", "2", "-s", "3"]).unwrap();
        let config = cli_to_ramdisk_config(&cli.config);
        assert!(!config.encrypt);
        assert_eq!(config.dispatch_strategy(), DispatchStrategy::DirectSegment);
        match cli.command {
            CliCommand::Roundtrip(args) => {
                assert_eq!(args.sector, 3);
                assert_eq!(args.device.device, 0);
            }
            _ => panic!("unexpected subcommand"),
        }
    }

    #[test]
    fn test_cli_key_sources_conflict() {
        assert!(Cli::try_parse_from(["cryptrd-cli", "--key", "abc", "-K", "00", "info"]).is_err());
    }
}
