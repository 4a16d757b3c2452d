use std::path::PathBuf;

use minifb::Scale;
use structopt::StructOpt;


#[derive(Debug, StructOpt)]
#[structopt(name = "hamboy", about = "A handheld console emulator.")]
pub struct Args {
    #[structopt(
        short = "v",
        help = "Trace every executed CPU instruction."
    )]
    pub trace_cpu: bool,

    #[structopt(
        short = "V",
        help = "Trace the frame driver."
    )]
    pub trace_driver: bool,

    #[structopt(
        short = "u",
        help = "Print unknown opcodes and skip their operand bytes instead of stopping."
    )]
    pub skip_unknown: bool,

    #[structopt(
        short = "f",
        help = "Skip the screen lock on CPU stores; every frame redraws all planes."
    )]
    pub fast: bool,

    #[structopt(
        long = "scale",
        default_value = "4",
        parse(try_from_str = "parse_scale"),
        help = "Set the scale factor for the window: 1, 2, 4, 8, 16 or 32."
    )]
    pub scale: Scale,

    #[structopt(
        parse(from_os_str),
        help = "Path of the ROM to run."
    )]
    pub rom_file: PathBuf,
}

fn parse_scale(src: &str) -> Result<Scale, &'static str> {
    match src {
        "1" => Ok(Scale::X1),
        "2" => Ok(Scale::X2),
        "4" => Ok(Scale::X4),
        "8" => Ok(Scale::X8),
        "16" => Ok(Scale::X16),
        "32" => Ok(Scale::X32),
        _ => Err("only '1', '2', '4', '8', '16' or '32' are allowed"),
    }
}
