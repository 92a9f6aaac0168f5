use log::debug;

use crate::{mode::ModeParameter, standard::LineFamily};

/// Minimum input front porch, in input clocks.
const MIN_FRONT_PORCH: f64 = 14.0;
/// Minimum input back porch, in input clocks.
const MIN_BACK_PORCH: f64 = 4.0;
/// Encoder line buffer, in samples.
const FIFO_SIZE: f64 = 1024.0;
const HEAD_ROOM: f64 = 32.0;
/// Fixed point unity of the vertical scaler.
pub const VSCALE_ONE: f64 = 4096.0;

/// How the input porches were split against the line buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoBalance {
  Balanced,
  /// Overflow cannot be avoided, back porch shrunk to delay it.
  OverflowExpected,
  /// Underflow cannot be avoided, front porch shrunk to delay it.
  UnderflowExpected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlankingParameter {
  pub h_blanki: i32,
  pub h_blanko: i32,
  pub v_blanki: i32,
  pub v_blanko: i32,
  /// Vertical scale minus one, 4096 = unity.
  pub vscale: i32,
  pub fifo: FifoBalance,
}

pub fn calc_blankings(m: &ModeParameter) -> BlankingParameter {
  let params = m.standard.params();
  let tlo = params.total_lines_out;
  let vsr = m.v_linesi as f64 / tlo;
  let v_activeo = m.v_activeo() as f64;
  let h_clko = m.h_clko() as f64;
  let h_clki = m.h_clki as f64;
  let h_active = m.h_active as f64;

  let h_blanko = 2 * (params.image_centre / (2.0 * params.hsync_period) * h_clko + 0.5) as i64
    - m.h_active as i64 + 15;

  let v_blanko = match m.standard.family() {
    LineFamily::Lines525 => (140.0 - v_activeo / 2.0 + 0.5) as i64,
    LineFamily::Lines625 => (167.0 - v_activeo / 2.0 + 0.5) as i64,
  };

  let mut vsrq = ((vsr * VSCALE_ONE + 0.5) as i64) as f64 / VSCALE_ONE;
  let mut vscale = ((vsr - 1.0) * VSCALE_ONE + 0.5) as i64;
  if vsrq < vsr {
    // output clock units
    let drift = (vsrq - vsr) * tlo / vsr * h_clko;
    let min_front_porch_in = MIN_FRONT_PORCH / (h_clki * vsr) * h_clko;
    let front_porch_out = h_clko - h_blanko as f64 - h_active * 2.0;
    let fifo_margin = (FIFO_SIZE - h_active) * 2.0;

    if front_porch_out + fifo_margin < -drift + min_front_porch_in {
      let total_blank_out = h_clko - h_active * 2.0;
      let total_blank_in = (h_clki - h_active) / h_clki / vsr * h_clko;
      let drift = (vsrq + 1.0 / VSCALE_ONE - vsr) * tlo / vsr * h_clko;

      // rounding up reverses the drift, take it only if both limits then hold
      if total_blank_out + fifo_margin >= total_blank_in + drift {
        vsrq += 1.0 / VSCALE_ONE;
        vscale = ((vsrq - 1.0) * VSCALE_ONE) as i64;
        debug!("vertical scale rounded up to {}", vscale);
      }
    }
  }

  let v_blanki = ((v_blanko - 1) as f64 * vsrq) as i64;

  // input clock units
  let total_blank_in = h_clki - h_active;
  let mut front_porch_in = MIN_FRONT_PORCH.max((total_blank_in / 8.0).min(total_blank_in - MIN_BACK_PORCH));
  let mut back_porch_in = total_blank_in - front_porch_in;
  let drift = (vsrq - vsr) * tlo * h_clki;
  let total_blank_out = (h_clko - h_active * 2.0) / h_clko * vsr * h_clki;
  let back_porch_out = h_blanko as f64 / h_clko * vsr * h_clki;
  let front_porch_out = total_blank_out - back_porch_out;
  let fifo_margin = (FIFO_SIZE - h_active) * 2.0 / h_clko * vsr * h_clki;
  let mut head_room = HEAD_ROOM;

  let fifo = if total_blank_out + fifo_margin >= total_blank_in + drift.abs() {
    let max_head_room = (total_blank_out + fifo_margin) - (total_blank_in - drift.abs());
    if max_head_room < head_room * 2.0 {
      head_room = ((max_head_room / 2.0) as i64) as f64;
    }

    if (front_porch_out + fifo_margin) - head_room < front_porch_in - drift.min(0.0) {
      front_porch_in = MIN_FRONT_PORCH.max(front_porch_out + fifo_margin + drift.min(0.0) - head_room);
      back_porch_in = total_blank_in - front_porch_in;
    }

    if back_porch_out - head_room < back_porch_in + drift.max(0.0) {
      back_porch_in = MIN_BACK_PORCH.max(back_porch_out - drift.max(0.0) - head_room);
    }
    FifoBalance::Balanced
  } else if drift < 0.0 {
    debug!("Overflow expected");
    back_porch_in = (back_porch_out - 1.0).min(total_blank_in - MIN_FRONT_PORCH);
    FifoBalance::OverflowExpected
  } else {
    debug!("Underflow expected");
    front_porch_in = (front_porch_out + fifo_margin - 1.0).min(total_blank_in - MIN_BACK_PORCH);
    back_porch_in = total_blank_in - front_porch_in;
    FifoBalance::UnderflowExpected
  };

  let blanks = BlankingParameter {
    h_blanki: back_porch_in as i32,
    h_blanko: h_blanko as i32,
    v_blanki: v_blanki as i32,
    v_blanko: v_blanko as i32,
    vscale: vscale as i32,
    fifo,
  };
  debug!("{:?}", blanks);
  blanks
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{mode::{ClockRatio, ModeParameter}, standard::VideoStandard};

  fn mode(standard: VideoStandard, w: u32, h: u32, lines: u32, h_clki: u32, clk_ratio: ClockRatio) -> ModeParameter {
    ModeParameter { standard, h_active: w, v_activei: h, bpp: 32, v_linesi: lines, h_clki, clk_ratio }
  }

  fn assert_blanks(b: BlankingParameter, h_blanki: i32, h_blanko: i32, v_blanki: i32, v_blanko: i32, vscale: i32) {
    assert_eq!((b.h_blanki, b.h_blanko, b.v_blanki, b.v_blanko, b.vscale), (h_blanki, h_blanko, v_blanki, v_blanko, vscale));
  }

  #[test]
  fn pal_800x600() {
    let b = calc_blankings(&mode(VideoStandard::PalBdghi, 800, 600, 750, 1420, ClockRatio::ThreeHalves));
    assert_blanks(b, 542, 507, 98, 42, 5734);
    assert_eq!(b.fifo, FifoBalance::Balanced);
  }

  #[test]
  fn ntsc_720x576() {
    let b = calc_blankings(&mode(VideoStandard::Ntsc, 720, 576, 735, 1095, ClockRatio::ThreeHalves));
    assert_blanks(b, 328, 443, 100, 37, 7373);
  }

  #[test]
  fn pal_640x480() {
    let b = calc_blankings(&mode(VideoStandard::PalBdghi, 640, 480, 600, 950, ClockRatio::Unity));
    assert_blanks(b, 271, 413, 78, 42, 3768);
  }

  #[test]
  fn underflow_adjusted_back_porch() {
    let b = calc_blankings(&mode(VideoStandard::PalBdghi, 720, 480, 600, 1600, ClockRatio::ThreeHalves));
    assert_blanks(b, 659, 461, 78, 42, 3768);
    assert_eq!(b.fifo, FifoBalance::Balanced);
  }

  #[test]
  fn overflow_delayed() {
    let b = calc_blankings(&mode(VideoStandard::Ntsc, 800, 480, 507, 700, ClockRatio::ThreeHalves));
    assert_blanks(b, -419, -279, 28, 16, 3815);
    assert_eq!(b.fifo, FifoBalance::OverflowExpected);
  }

  #[test]
  fn underflow_delayed() {
    let b = calc_blankings(&mode(VideoStandard::Ntsc, 800, 480, 500, 700, ClockRatio::ThreeHalves));
    assert_blanks(b, 4, -287, 24, 14, 3706);
    assert_eq!(b.fifo, FifoBalance::UnderflowExpected);
  }

  #[test]
  fn scale_rounded_up_to_avoid_overflow() {
    let b = calc_blankings(&mode(VideoStandard::Ntsc, 1024, 480, 507, 1177, ClockRatio::Unity));
    assert_blanks(b, 139, 267, 28, 16, 3816);
    assert_eq!(b.fifo, FifoBalance::Balanced);
  }

  #[test]
  fn pure() {
    let m = mode(VideoStandard::PalM, 640, 576, 700, 900, ClockRatio::Unity);
    assert_eq!(calc_blankings(&m), calc_blankings(&m));
  }
}
