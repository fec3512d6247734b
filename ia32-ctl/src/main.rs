//! Command line front end for the `ia32` codecs and walkers.

use crate::error::Error;
use clap::{Parser, Subcommand, ValueEnum};
use ia32::{
    ept::{EptCapabilities, EptEntry},
    paging::{Entry, Level},
    vmcs::{self, AccessType, FieldType, FieldWidth, VmcsField},
    HierarchyKind, Translation,
};
use std::{fmt::Write, path::PathBuf};

mod error;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode, decode and look up VMCS field identifiers
    #[command(subcommand)]
    Vmcs(VmcsCommand),

    /// Decode a raw paging-structure entry
    Entry {
        #[arg(value_enum)]
        level: LevelArg,
        #[arg(value_parser = parse_number)]
        raw: u64,
        /// Decode as an EPT entry
        #[arg(long, default_value_t = false)]
        ept: bool,
    },

    /// Translate an address against a flat physical memory image
    Walk {
        /// File whose offsets are physical addresses
        #[arg(long)]
        image: PathBuf,
        /// Physical address of the root table
        #[arg(long, value_parser = parse_number)]
        root: u64,
        #[arg(long, value_parser = parse_number)]
        address: u64,
        #[arg(long, value_enum, default_value_t = Mode::FourLevel)]
        mode: Mode,
        /// Treat the XD bit as reserved (EFER.NXE=0)
        #[arg(long, default_value_t = false)]
        no_nxe: bool,
        /// Ignore the page size bit of 32-bit PDEs (CR4.PSE=0)
        #[arg(long, default_value_t = false)]
        no_pse: bool,
        /// Value of IA32_VMX_EPT_VPID_CAP, everything is supported if omitted
        #[arg(long, value_parser = parse_number)]
        capabilities: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum VmcsCommand {
    Decode {
        #[arg(value_parser = parse_number)]
        id: u64,
    },
    Encode {
        #[arg(long = "type", value_enum)]
        ty: TypeArg,
        #[arg(long, value_enum)]
        width: WidthArg,
        #[arg(long, value_parser = parse_number)]
        index: u64,
        /// Access the upper 32 bits of a 64-bit field
        #[arg(long, default_value_t = false)]
        high: bool,
    },
    /// Accepts `guest_rip` as well as `guest::RIP`
    Lookup { name: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LevelArg {
    Pml4,
    Pdpt,
    Pd,
    Pt,
}

impl From<LevelArg> for Level {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Pml4 => Level::Pml4,
            LevelArg::Pdpt => Level::Pdpt,
            LevelArg::Pd => Level::Pd,
            LevelArg::Pt => Level::Pt,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Legacy32,
    FourLevel,
    Ept,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TypeArg {
    Control,
    ReadOnly,
    Guest,
    Host,
}

impl From<TypeArg> for FieldType {
    fn from(ty: TypeArg) -> Self {
        match ty {
            TypeArg::Control => FieldType::Control,
            TypeArg::ReadOnly => FieldType::VmExitInformation,
            TypeArg::Guest => FieldType::GuestState,
            TypeArg::Host => FieldType::HostState,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum WidthArg {
    #[value(name = "16")]
    Word,
    #[value(name = "64")]
    Quadword,
    #[value(name = "32")]
    Doubleword,
    Natural,
}

impl From<WidthArg> for FieldWidth {
    fn from(width: WidthArg) -> Self {
        match width {
            WidthArg::Word => FieldWidth::Word,
            WidthArg::Quadword => FieldWidth::Quadword,
            WidthArg::Doubleword => FieldWidth::Doubleword,
            WidthArg::Natural => FieldWidth::Natural,
        }
    }
}

/// Parses decimal or `0x` prefixed hexadecimal numbers.
fn parse_number(value: &str) -> Result<u64, String> {
    let value = value.replace('_', "");
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };

    parsed.map_err(|e| format!("invalid number `{}`: {}", value, e))
}

fn run_vmcs(command: VmcsCommand) -> Result<String, Error> {
    let field = match command {
        VmcsCommand::Decode { id } => {
            // Anything above 32 bits can never be a valid operand.
            let encoding = u32::try_from(id).unwrap_or(u32::MAX);
            VmcsField::decode(encoding)?
        }
        VmcsCommand::Encode {
            ty,
            width,
            index,
            high,
        } => {
            let access = if high { AccessType::High } else { AccessType::Full };
            let index = u16::try_from(index).unwrap_or(u16::MAX);
            let encoding = vmcs::encode(ty.into(), width.into(), index, access)?;
            vmcs::decode(encoding)?
        }
        VmcsCommand::Lookup { name } => {
            vmcs::by_name(&name).ok_or_else(|| Error::UnknownField(name.clone()))?
        }
    };

    Ok(field.to_string())
}

fn run_entry(level: Level, raw: u64, ept: bool) -> Result<String, Error> {
    let decoded = if ept {
        format!("{:#x?}", EptEntry::decode(raw, level)?)
    } else {
        format!("{:#x?}", Entry::decode(raw, level)?)
    };

    Ok(format!("{} entry {:#x}: {}", level, raw, decoded))
}

fn run_walk(
    image: &[u8],
    root: u64,
    address: u64,
    kind: HierarchyKind,
) -> Result<String, Error> {
    let translation = ia32::translate(image, root, address, kind)?;

    let mut output = String::new();
    for step in translation.path() {
        let _ = writeln!(
            output,
            "{:<4} [{:#x}] = {:#018x}",
            step.level, step.address, step.entry
        );
    }
    let _ = write!(
        output,
        "{:#x} -> {:#x} ({:?}",
        address,
        translation.physical_address().as_u64(),
        translation.page_size()
    );
    let _ = match &translation {
        Translation::Paging(paging) => write!(output, ", {:?})", paging.access),
        Translation::Ept(ept) => write!(output, ", {:?}, {})", ept.access, ept.memory_type),
    };

    Ok(output)
}

fn run(command: Command) -> Result<String, Error> {
    match command {
        Command::Vmcs(command) => run_vmcs(command),
        Command::Entry { level, raw, ept } => run_entry(level.into(), raw, ept),
        Command::Walk {
            image,
            root,
            address,
            mode,
            no_nxe,
            no_pse,
            capabilities,
        } => {
            let memory = std::fs::read(&image).map_err(|source| Error::Image {
                path: image.clone(),
                source,
            })?;
            log::info!("Loaded {} bytes from {}", memory.len(), image.display());

            let kind = match mode {
                Mode::Legacy32 => HierarchyKind::Legacy32 { pse: !no_pse },
                Mode::FourLevel => HierarchyKind::FourLevel { nxe: !no_nxe },
                Mode::Ept => HierarchyKind::Ept {
                    capabilities: capabilities
                        .map(EptCapabilities::from_msr)
                        .unwrap_or_else(EptCapabilities::all),
                },
            };

            run_walk(&memory, root, address, kind)
        }
    }
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    log::debug!("{:?}", args);

    match run(args.command) {
        Ok(output) => println!("{}", output),
        Err(error) => {
            eprintln!("error: {}", error);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn parse(args: &[&str]) -> Command {
        let args = std::iter::once("ia32-ctl").chain(args.iter().copied());
        Args::try_parse_from(args).unwrap().command
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number("0x681e"), Ok(0x681e));
        assert_eq!(parse_number("0xffff_8000_0000_0000"), Ok(0xffff_8000_0000_0000));
        assert_eq!(parse_number("4096"), Ok(4096));
        assert!(parse_number("0xzz").is_err());
    }

    #[test]
    fn vmcs_commands() {
        assert_eq!(
            run(parse(&["vmcs", "decode", "0x4402"])).unwrap(),
            "0x4402 (32-bit read-only #1) ro_exit_reason"
        );
        let output = run(parse(&[
            "vmcs", "encode", "--type", "guest", "--width", "natural", "--index", "15",
        ]))
        .unwrap();
        assert!(output.starts_with("0x681e "));
        assert!(run(parse(&["vmcs", "lookup", "guest::RIP"]))
            .unwrap()
            .starts_with("0x681e "));

        assert!(matches!(
            run(parse(&["vmcs", "decode", "0x681f"])),
            Err(Error::Ia32(ia32::Error::InvalidAccessType { encoding: 0x681f }))
        ));
        assert!(matches!(
            run(parse(&["vmcs", "lookup", "guest_nothing"])),
            Err(Error::UnknownField(_))
        ));
    }

    #[test]
    fn entry_command() {
        let output = run(parse(&["entry", "pd", "0x200083"])).unwrap();
        assert!(output.starts_with("PD entry 0x200083: Page"));

        assert!(matches!(
            run(parse(&["entry", "pt", "0x5002", "--ept"])),
            Err(Error::Ia32(ia32::Error::MisconfiguredPermissions { .. }))
        ));
    }

    #[test]
    fn walk_reads_the_image() {
        // PML4 at 0x0 -> PDPT at 0x1000, PDPT[0] maps 1 GiB at 0.
        let mut image = vec![0u8; 0x2000];
        image[..8].copy_from_slice(&0x1003u64.to_le_bytes());
        image[0x1000..0x1008].copy_from_slice(&0x83u64.to_le_bytes());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&image).unwrap();
        let path = file.path().to_str().unwrap();

        let output =
            run(parse(&["walk", "--image", path, "--root", "0", "--address", "0x1234"])).unwrap();
        assert!(output.ends_with("0x1234 -> 0x1234 (Size1G, WRITE | EXECUTE)"));
        assert_eq!(output.lines().count(), 3);

        // Read/write as EPT entries, with an uncacheable 1 GiB leaf.
        let output = run(parse(&[
            "walk", "--image", path, "--root", "0", "--address", "0x1234", "--mode", "ept",
        ]))
        .unwrap();
        assert!(output.ends_with("0x1234 -> 0x1234 (Size1G, READ | WRITE, UC)"));

        assert!(matches!(
            run(parse(&[
                "walk", "--image", path, "--root", "0", "--address", "0x1234", "--mode", "ept",
                "--capabilities", "0",
            ])),
            Err(Error::Ia32(ia32::Error::ReservedBitsSet { .. }))
        ));
    }

    #[test]
    fn missing_image() {
        assert!(matches!(
            run(parse(&[
                "walk", "--image", "/nonexistent/image", "--root", "0", "--address", "0",
            ])),
            Err(Error::Image { .. })
        ));
    }
}
