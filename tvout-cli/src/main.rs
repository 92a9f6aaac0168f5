use std::{error::Error, path::PathBuf};

use common::{hertz::MHZ, utils};
use log::info;
use structopt::StructOpt;
use tvout::{
  blanking::calc_blankings,
  boot::{common_init_program, init_display, plan_output, preamble_program, BootConfig, DisplayState, Outcome},
  detect::ConnectorType,
  encoder::EncoderTiming,
  hwbus::{Recorder, Transaction},
  mode::{Overscan, Resolution, VideoMode},
  program::{Devices, Program},
  solver::find_overscan_values,
  standard::VideoStandard,
};

mod logging;
mod profile;

use profile::Profile;

#[derive(StructOpt, Debug)]
#[structopt(name = "tvout", about = "Xbox TV encoder timing solver and boot simulator")]
struct Cli {
  #[structopt(short, long)]
  verbose: bool,
  #[structopt(long)]
  log_file: bool,
  #[structopt(subcommand)]
  cmd: Command,
}

#[derive(StructOpt, Debug)]
enum Command {
  /// Solves the overscan for one resolution and prints the derived timing
  Solve {
    #[structopt(parse(try_from_str = parse_resolution))]
    resolution: Resolution,
    #[structopt(short, long, default_value = "ntsc")]
    standard: VideoStandard,
    /// Horizontal overscan target, defaults to the standard's region value
    #[structopt(long)]
    horizontal: Option<f64>,
    #[structopt(long)]
    vertical: Option<f64>,
    #[structopt(long, default_value = "32")]
    bpp: u32,
  },
  /// Boots a simulated box described by a YAML profile
  Boot {
    profile: PathBuf,
    /// Print every bus, MMIO and port transaction
    #[structopt(short, long)]
    trace: bool,
  },
  /// Solves every standard and mode preset
  Sweep,
  /// Prints the register program for a mode without running it
  Program {
    #[structopt(default_value = "800x600")]
    mode: VideoMode,
    #[structopt(short, long, default_value = "ntsc")]
    standard: VideoStandard,
    #[structopt(short, long, default_value = "composite")]
    connector: ConnectorType,
    #[structopt(short, long, parse(try_from_str = utils::parse_hex), default_value = "0")]
    framebuffer: u32,
  },
}

fn parse_resolution(s: &str) -> Result<Resolution, String> {
  let bad = || format!("expected WIDTHxHEIGHT, got {:?}", s);
  let (w, h) = s.split_once(['x', 'X']).ok_or_else(bad)?;
  let width = w.trim().parse().map_err(|_| bad())?;
  let height = h.trim().parse().map_err(|_| bad())?;
  Ok(Resolution { width, height })
}

fn percent(o: Overscan) -> String {
  format!("{:.2}% x {:.2}%", o.horizontal * 100.0, o.vertical * 100.0)
}

fn solve(resolution: Resolution, standard: VideoStandard, horizontal: Option<f64>, vertical: Option<f64>, bpp: u32) -> Result<(), Box<dyn Error>> {
  let defaults = Overscan::for_encoding(standard.encoding());
  let target = Overscan {
    horizontal: horizontal.unwrap_or(defaults.horizontal),
    vertical: vertical.unwrap_or(defaults.vertical),
  };
  let mode = find_overscan_values(resolution.width, resolution.height, target, bpp, standard)?;
  let blanks = calc_blankings(&mode);
  let timing = EncoderTiming::compute(&mode);

  let rows: [(&str, String); 17] = [
    ("standard", standard.to_string()),
    ("resolution", format!("{}x{}", mode.h_active, mode.v_activei)),
    ("target", percent(target)),
    ("overscan", percent(mode.overscan())),
    ("v_linesi", mode.v_linesi.to_string()),
    ("h_clki", mode.h_clki.to_string()),
    ("clk_ratio", mode.clk_ratio.value().to_string()),
    ("h_clko/2", (timing.h_clko / 2).to_string()),
    ("v_activeo", timing.v_activeo.to_string()),
    ("h_blanki", blanks.h_blanki.to_string()),
    ("h_blanko", blanks.h_blanko.to_string()),
    ("v_blanki", blanks.v_blanki.to_string()),
    ("v_blanko", blanks.v_blanko.to_string()),
    ("vscale", blanks.vscale.to_string()),
    ("fifo", format!("{:?}", blanks.fifo)),
    ("pll", format!("{:.6} MHz (int {} fract {:#06x})", timing.pll_hz / MHZ, timing.pll_int, timing.pll_fract)),
    ("subcarrier", format!("{:#010x}", timing.subcarrier_increment)),
  ];
  for (name, value) in rows {
    println!("{:<12}{}", name, value);
  }
  Ok(())
}

fn fingerprint(trace: &[Transaction]) -> u32 {
  let mut hasher = crc32fast::Hasher::new();
  for t in trace {
    hasher.update(t.to_string().as_bytes());
    hasher.update(b"\n");
  }
  hasher.finalize()
}

fn describe(outcome: &Outcome) -> String {
  match outcome {
    Outcome::Vga => "vga 800x600".into(),
    Outcome::Tv(tv) => format!(
      "tv {} lines, {} clocks, ratio {}, overscan {}",
      tv.mode.v_linesi, tv.mode.h_clki, tv.mode.clk_ratio.value(), percent(tv.mode.overscan())
    ),
    Outcome::Skipped(e) => format!("skipped ({})", e),
  }
}

fn print_state(state: &DisplayState) {
  let rows = [
    ("standard", state.standard.to_string()),
    ("encoding", format!("{:?}", state.encoding)),
    ("connector", state.connector.to_string()),
    ("av_pack", format!("{:#04x}", state.av_pack)),
    ("resolution", format!("{}x{}", state.resolution.width, state.resolution.height)),
    ("margins", format!("{}x{}", state.margins.x, state.margins.y)),
    ("bpp", state.bits_per_pixel.to_string()),
    ("framebuffer", format!("{:#010x}", state.framebuffer_start)),
    ("brightness", format!("{:02x} {:02x} {:02x}", state.brightness[0], state.brightness[1], state.brightness[2])),
    ("outcome", describe(&state.outcome)),
  ];
  for (name, value) in rows {
    println!("{:<12}{}", name, value);
  }
}

fn boot(path: PathBuf, trace: bool) -> Result<(), Box<dyn Error>> {
  let profile = Profile::load(&path)?;
  let config = profile.boot_config()?;
  let mut sbox = profile.simulated_box()?;

  let rec = Recorder::new();
  let res = {
    let mut bus = rec.bus(&mut sbox.bus);
    let mut regs = rec.regs(&mut sbox.gpu);
    let mut ports = rec.ports(&mut sbox.ports);
    init_display(&config, &mut Devices::new(&mut bus, &mut regs, &mut ports))
  };

  let transactions = rec.transactions();
  if trace {
    for t in &transactions {
      println!("{}", t);
    }
  }
  let state = res?;
  print_state(&state);
  println!("{:<12}{}", "trace", transactions.len());
  println!("{:<12}{:08x}", "crc32", fingerprint(&transactions));
  Ok(())
}

fn sweep() -> Result<(), Box<dyn Error>> {
  let mut failed = 0;
  for standard in VideoStandard::ALL {
    let target = Overscan::for_encoding(standard.encoding());
    for vm in VideoMode::ALL {
      let res = vm.resolution();
      match find_overscan_values(res.width, res.height, target, 32, standard) {
        Ok(mode) => {
          let blanks = calc_blankings(&mode);
          println!(
            "{:<10} {:>9}  lines {:4}  h_clki {:5}  ratio {:3}  overscan {}  vscale {:5}  {:?}",
            standard.name(), vm.to_string(), mode.v_linesi, mode.h_clki, mode.clk_ratio.value(),
            percent(mode.overscan()), blanks.vscale, blanks.fifo
          );
        }
        Err(e) => {
          failed += 1;
          println!("{:<10} {:>9}  {}", standard.name(), vm.to_string(), e);
        }
      }
    }
  }
  let total = VideoStandard::ALL.len() * VideoMode::ALL.len();
  println!("{} solved, {} failed", total - failed, failed);
  Ok(())
}

fn program(mode: VideoMode, standard: VideoStandard, connector: ConnectorType, framebuffer: u32) -> Result<(), Box<dyn Error>> {
  let config = BootConfig {
    video_mode: mode.index(),
    standard: Some(standard),
    connector: Some(connector),
    framebuffer_start: framebuffer,
    ..BootConfig::default()
  };
  let overscan = Overscan::for_encoding(standard.encoding());
  let plan = plan_output(&config, standard, overscan, connector)?;
  info!("{} {} via {}: {}", mode, standard, connector, describe(&plan.outcome));

  let mut all = Program::new();
  all.append(preamble_program(framebuffer))
    .append(plan.program)
    .append(common_init_program(framebuffer));
  print!("{}", all);
  Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
  let args = Cli::from_args();
  let _logger = logging::init(args.verbose, args.log_file)?;

  match args.cmd {
    Command::Solve { resolution, standard, horizontal, vertical, bpp } => solve(resolution, standard, horizontal, vertical, bpp),
    Command::Boot { profile, trace } => boot(profile, trace),
    Command::Sweep => sweep(),
    Command::Program { mode, standard, connector, framebuffer } => program(mode, standard, connector, framebuffer),
  }
}
