//! Executable for inspecting and building UEFI load options.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

use clap::{Parser, Subcommand};
use r_efi::efi;
use std::{
    fs::{self, File},
    io::{self, Read, Write},
    path::{Path, PathBuf},
};
use uefi_load_option::{
    boot_manager::BootManager,
    device_path::HardDriveDevicePath,
    load_option::{LoadOption, LOAD_OPTION_ACTIVE, LOAD_OPTION_HIDDEN},
    services::{FixedPartition, PartitionInfo, PartitionResolver, VariableStore},
    text,
};

/// Vendor GUID of the EFI global variable namespace, as it appears in efivarfs file names.
const EFI_GLOBAL_VARIABLE: &str = "8be4df61-93ca-11d2-aa0d-00e098032b8c";
/// NON_VOLATILE | BOOTSERVICE_ACCESS | RUNTIME_ACCESS
const VARIABLE_ATTRIBUTES: u32 = 0x0000_0007;
const DEFAULT_EFIVARFS: &str = "/sys/firmware/efi/efivars";

#[derive(Parser, Debug)]
struct Args {
    /// Maximum level of diagnostics written to stderr.
    #[arg(long, default_value_t = log::LevelFilter::Warn)]
    log_level: log::LevelFilter,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a load option stored in a file.
    Show {
        /// Path for the input file containing the raw load option.
        input_path: PathBuf,
        /// Boot number to report for the option, in hex (`0001` or `Boot0001`).
        #[arg(short, long, value_parser = parse_boot_number)]
        boot_number: Option<u16>,
        /// Skip decoding the device path list.
        #[arg(short, long, default_value_t = false)]
        summary: bool,
        /// The input starts with the 4 attribute bytes efivarfs prepends to variable data.
        #[arg(long, default_value_t = false)]
        efivarfs_header: bool,
    },
    /// Build a load option for a loader on a GPT partition.
    Make {
        #[command(flatten)]
        option: OptionArgs,
        /// Optional path for the output file. If not specified, a hex view is printed to stdout.
        #[arg(short, long)]
        output_path: Option<PathBuf>,
    },
    /// Summarize every entry of the boot order.
    List {
        /// Root of the efivarfs mount.
        #[arg(long, default_value = DEFAULT_EFIVARFS)]
        efivarfs: PathBuf,
    },
    /// Store a new load option under an unused boot number and append it to the boot order.
    Set {
        #[command(flatten)]
        option: OptionArgs,
        /// Root of the efivarfs mount.
        #[arg(long, default_value = DEFAULT_EFIVARFS)]
        efivarfs: PathBuf,
    },
    /// Move an entry of the boot order.
    Order {
        /// 1-based position of the entry to move.
        from: usize,
        /// 1-based position to move it to.
        to: usize,
        /// Root of the efivarfs mount.
        #[arg(long, default_value = DEFAULT_EFIVARFS)]
        efivarfs: PathBuf,
    },
    /// Remove a load option from the boot order and delete its variable.
    Delete {
        /// Boot number to delete, in hex (`0001` or `Boot0001`).
        #[arg(value_parser = parse_boot_number)]
        boot_number: u16,
        /// Root of the efivarfs mount.
        #[arg(long, default_value = DEFAULT_EFIVARFS)]
        efivarfs: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct OptionArgs {
    /// Path of the loader, either on the host under `--mount-point` or relative to the partition.
    #[arg(short, long)]
    loader: String,
    /// Description shown in the firmware boot menu.
    #[arg(long)]
    label: String,
    /// Text stored as optional data, typically kernel arguments.
    #[arg(short, long)]
    unicode: Option<String>,
    /// 1-based index of the partition in the partition table.
    #[arg(long)]
    partition_number: u32,
    /// Starting LBA of the partition.
    #[arg(long)]
    partition_start: u64,
    /// Size of the partition in logical blocks.
    #[arg(long)]
    partition_size: u64,
    /// Unique partition GUID.
    #[arg(long)]
    partition_guid: uuid::Uuid,
    /// Where the partition is mounted on the host.
    #[arg(short, long)]
    mount_point: Option<String>,
    /// Set the hidden attribute.
    #[arg(long, default_value_t = false)]
    hidden: bool,
    /// Clear the active attribute.
    #[arg(long, default_value_t = false)]
    inactive: bool,
}

fn parse_boot_number(arg: &str) -> Result<u16, String> {
    let digits = arg.strip_prefix("Boot").unwrap_or(arg);
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid boot number {arg:?}: {e}"))
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    log::set_max_level(args.log_level);
    log::set_logger(&STDERR_LOGGER).map_err(io::Error::other)?;

    match args.command {
        Command::Show { input_path, boot_number, summary, efivarfs_header } => {
            let mut buffer = Vec::new();
            File::open(Path::new(&input_path))?.read_to_end(&mut buffer)?;

            let bytes = match efivarfs_header {
                true if buffer.len() < 4 => {
                    return Err(io::Error::new(io::ErrorKind::InvalidData, "missing efivarfs attribute header"));
                }
                true => &buffer[4..],
                false => &buffer[..],
            };

            let option = LoadOption::decode(bytes, boot_number, !summary).map_err(|e| {
                eprintln!("Error decoding load option: {}", e);
                io::Error::new(io::ErrorKind::InvalidData, e)
            })?;
            write_option(&option, &mut io::stdout())
        }
        Command::Make { option, output_path } => {
            let option = make_option(option)?;

            match output_path {
                Some(path) => File::create(path)?.write_all(&option.to_bytes()),
                None => writeln!(io::stdout(), "{}", text::hex_ascii_view(&option.to_bytes())),
            }
        }
        Command::List { efivarfs } => {
            let store = EfiVarFs::new(efivarfs);
            let options = BootManager::new(&store).list(false).map_err(|e| manager_error("reading boot entries", e))?;

            let mut out = io::stdout();
            for option in &options {
                write_summary(option, &mut out)?;
            }
            Ok(())
        }
        Command::Set { option, efivarfs } => {
            let option = make_option(option)?;
            let store = EfiVarFs::new(efivarfs);
            let boot_number =
                BootManager::new(&store).add(&option).map_err(|e| manager_error("storing boot entry", e))?;
            writeln!(io::stdout(), "Boot{boot_number:04X}")
        }
        Command::Order { from, to, efivarfs } => {
            let (Some(from), Some(to)) = (from.checked_sub(1), to.checked_sub(1)) else {
                return Err(io::Error::new(io::ErrorKind::InvalidInput, "boot order positions start at 1"));
            };
            let store = EfiVarFs::new(efivarfs);
            let order =
                BootManager::new(&store).reorder(from, to).map_err(|e| manager_error("changing boot order", e))?;

            let entries: Vec<String> = order.iter().map(|n| format!("{n:04X}")).collect();
            writeln!(io::stdout(), "BootOrder: {}", entries.join(","))
        }
        Command::Delete { boot_number, efivarfs } => {
            let store = EfiVarFs::new(efivarfs);
            BootManager::new(&store).delete(boot_number).map_err(|e| manager_error("deleting boot entry", e))
        }
    }
}

fn manager_error(action: &str, e: uefi_load_option::Error) -> io::Error {
    eprintln!("Error {}: {}", action, e);
    io::Error::other(e)
}

fn make_option(args: OptionArgs) -> io::Result<LoadOption> {
    let resolver = FixedPartition(PartitionInfo {
        partition_number: args.partition_number,
        partition_start: args.partition_start,
        partition_size: args.partition_size,
        partition_guid: efi::Guid::from_bytes(&args.partition_guid.to_bytes_le()),
        mount_point: args.mount_point,
    });
    let partition =
        resolver.resolve_partition(&args.loader).map_err(|status| io::Error::other(format!("{status:?}")))?;
    let option = LoadOption::new(&args.loader, &args.label, args.unicode.as_deref(), &partition).map_err(|e| {
        eprintln!("Error building load option: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    let mut attributes = option.attributes();
    if args.hidden {
        attributes |= LOAD_OPTION_HIDDEN;
    }
    if args.inactive {
        attributes &= !LOAD_OPTION_ACTIVE;
    }
    Ok(option.with_attributes(attributes))
}

fn write_summary<W: Write>(option: &LoadOption, out: &mut W) -> io::Result<()> {
    let position = option.order().map(|n| format!("{:>2}:", n + 1)).unwrap_or_else(|| String::from(" -:"));
    let boot_number = option.boot_number().map(|n| format!("Boot{n:04X}")).unwrap_or_default();
    let marker = if option.enabled() { '*' } else { ' ' };
    writeln!(out, "{position} {boot_number}{marker} {}", option.description_string())
}

fn write_option<W: Write>(option: &LoadOption, out: &mut W) -> io::Result<()> {
    if let Some(boot_number) = option.boot_number() {
        writeln!(out, "Boot number:      {boot_number:04X}")?;
    }
    writeln!(out, "Attributes:       {:#010x}", option.attributes())?;
    writeln!(out, "Enabled:          {}", option.enabled())?;
    writeln!(out, "Hidden:           {}", option.hidden())?;
    writeln!(out, "Description:      {}", option.description_string())?;
    writeln!(out, "Device path list: {} bytes", option.device_path_list_length())?;

    if !option.device_path_description().is_empty() {
        writeln!(out, "Device path:      {}", option.device_path_description())?;
    }
    if let Some(hard_drive) = option.hard_drive() {
        write_hard_drive(hard_drive, out)?;
    }
    if let Some(loader) = option.loader_path_string() {
        writeln!(out, "Loader:           {loader}")?;
    }
    if let (Some(data), Some(view)) = (option.optional_data_string(), option.optional_data_hex_view()) {
        writeln!(out, "Optional data:    {data}")?;
        writeln!(out, "{view}")?;
    }
    Ok(())
}

fn write_hard_drive<W: Write>(hard_drive: &HardDriveDevicePath, out: &mut W) -> io::Result<()> {
    writeln!(out, "Partition:        {}", hard_drive.partition_number)?;
    writeln!(out, "Partition start:  {}", hard_drive.partition_start)?;
    writeln!(out, "Partition size:   {}", hard_drive.partition_size)?;
    if let Some(uuid) = hard_drive.partition_uuid() {
        writeln!(out, "Partition GUID:   {uuid}")?;
    }
    Ok(())
}

/// Variables in the global namespace exposed through a Linux efivarfs mount.
struct EfiVarFs {
    root: PathBuf,
}

impl EfiVarFs {
    fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}-{EFI_GLOBAL_VARIABLE}"))
    }
}

fn io_status(error: &io::Error) -> efi::Status {
    match error.kind() {
        io::ErrorKind::NotFound => efi::Status::NOT_FOUND,
        io::ErrorKind::PermissionDenied => efi::Status::ACCESS_DENIED,
        _ => efi::Status::DEVICE_ERROR,
    }
}

impl VariableStore for EfiVarFs {
    fn get_variable(&self, name: &str) -> Result<Vec<u8>, efi::Status> {
        let path = self.path(name);
        let mut contents = fs::read(&path).map_err(|e| {
            log::debug!("Failed to read {}: {}", path.display(), e);
            io_status(&e)
        })?;
        if contents.len() < 4 {
            log::error!("{} is missing its attribute header", path.display());
            return Err(efi::Status::VOLUME_CORRUPTED);
        }
        Ok(contents.split_off(4))
    }

    fn set_variable(&self, name: &str, data: &[u8]) -> Result<(), efi::Status> {
        let path = self.path(name);
        if data.is_empty() {
            return fs::remove_file(&path).map_err(|e| io_status(&e));
        }
        let mut contents = VARIABLE_ATTRIBUTES.to_le_bytes().to_vec();
        contents.extend_from_slice(data);
        fs::write(&path, contents).map_err(|e| {
            log::error!("Failed to write {}: {}", path.display(), e);
            io_status(&e)
        })
    }
}

struct StderrLogger;

static STDERR_LOGGER: StderrLogger = StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{} - {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}
