use log::{debug, warn};

use crate::{
  error::TvOutError,
  mode::{ClockRatio, ModeParameter, Overscan},
  standard::{StandardParams, VideoStandard},
};

/// Shortest horizontal blanking the encoder accepts on its input side.
pub const MIN_HSYNC_TIME: f64 = 2.5e-6;
/// Half width of the overscan window searched around the target.
pub const SEARCH_SPAN: f64 = 0.02;
pub const RATIONAL_TOLERANCE: f64 = 1e-3;
const UNSOLVED_METRIC: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverscanRequest {
  pub h_active: u32,
  pub v_active: u32,
  pub target: Overscan,
}

impl OverscanRequest {
  pub fn new(h_active: u32, v_active: u32, target: Overscan) -> Self {
    Self { h_active, v_active, target }
  }

  pub fn validate(&self) -> Result<(), TvOutError> {
    let in_range = |v: f64| v.is_finite() && (0.0..1.0 - SEARCH_SPAN).contains(&v);
    if self.h_active == 0 || self.v_active == 0 || !in_range(self.target.horizontal) || !in_range(self.target.vertical) {
      return Err(TvOutError::InvalidOverscan);
    }
    Ok(())
  }
}

/// Inclusive bounds of the integer search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
  pub min_lines: u32,
  pub max_lines: u32,
  pub min_h_clko: u32,
  pub max_h_clko: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
  pub v_linesi: u32,
  pub h_clki: u32,
  pub h_clko: u32,
  pub clk_ratio: ClockRatio,
  pub achieved: Overscan,
  pub metric: f64,
}

/// Exhaustive search for encoder clocks that hit a requested overscan.
pub struct OverscanSolver<'a> {
  params: &'a StandardParams,
}

impl<'a> OverscanSolver<'a> {
  pub fn new(params: &'a StandardParams) -> Result<Self, TvOutError> {
    params.validate()?;
    Ok(Self { params })
  }

  pub fn window(&self, req: &OverscanRequest) -> SearchWindow {
    let p = self.params;
    let alo = p.active_lines_out as f64;
    let tlo = p.total_lines_out;
    let active_ratio = p.active_time_out() / p.hsync_period;

    let min_hoc = (req.target.horizontal - SEARCH_SPAN).max(0.0);
    let max_hoc = req.target.horizontal + SEARCH_SPAN;
    let min_voc = (req.target.vertical - SEARCH_SPAN).max(0.0);
    let max_voc = req.target.vertical + SEARCH_SPAN;

    let lines = |voc: f64| (req.v_active as f64 / ((1.0 - voc) * alo) * tlo) as u32;
    let clocks = |hoc: f64| ((req.h_active * 2) as f64 / ((1.0 - hoc) * active_ratio)) as u32;

    SearchWindow {
      min_lines: lines(min_voc),
      max_lines: lines(max_voc),
      min_h_clko: clocks(min_hoc),
      max_h_clko: clocks(max_hoc),
    }
  }

  /// Every valid candidate, clock ratio outermost, then line count, then output clock.
  pub fn candidates(&self, req: &OverscanRequest) -> impl Iterator<Item = Candidate> + 'a {
    let window = self.window(req);
    let req = *req;
    let params = self.params;
    ClockRatio::ALL.into_iter().flat_map(move |ratio| {
      (window.min_lines..=window.max_lines).flat_map(move |lines| {
        (window.min_h_clko..=window.max_h_clko)
          .filter_map(move |h_clko| evaluate(params, &req, ratio, lines, h_clko))
      })
    })
  }

  /// Global minimum of the error metric. Ties keep the earliest candidate.
  pub fn best(&self, req: &OverscanRequest) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for c in self.candidates(req) {
      let bar = best.map_or(UNSOLVED_METRIC, |b| b.metric);
      if c.metric < bar {
        best = Some(c);
      }
    }
    best
  }
}

fn evaluate(p: &StandardParams, req: &OverscanRequest, ratio: ClockRatio, lines: u32, h_clko: u32) -> Option<Candidate> {
  if lines == 0 {
    return None;
  }
  let tlo = p.total_lines_out;
  let tto = p.hsync_period;
  let r = ratio.value();

  let v_activeo = ((req.v_active as f64 * tlo + (lines - 1) as f64) / lines as f64) as i64;
  let voc = 1.0 - v_activeo as f64 / p.active_lines_out as f64;

  let h_clki = ((h_clko as f64 * r) * (tlo / lines as f64) + 0.5) as u32;
  let min_h_clki = ((MIN_HSYNC_TIME / tto) * h_clki as f64 + req.h_active as f64) as u32;
  let error = ((lines as u64 * h_clki as u64) as f64 - tlo * h_clko as f64 * r).abs();
  if error >= RATIONAL_TOLERANCE || h_clki < min_h_clki {
    return None;
  }

  let hoc = 1.0 - ((req.h_active as f64 / (h_clko as f64 / 2.0)) / (p.active_time_out() / tto));
  let dh = hoc - req.target.horizontal;
  let dv = voc - req.target.vertical;
  let delta = dh.abs() + dv.abs();
  Some(Candidate {
    v_linesi: lines,
    h_clki,
    h_clko,
    clk_ratio: ratio,
    achieved: Overscan { horizontal: hoc, vertical: voc },
    metric: dh * dh + dv * dv + 2.0 * delta * delta,
  })
}

pub fn find_overscan_values(
  h_active: u32,
  v_active: u32,
  target: Overscan,
  bpp: u32,
  standard: VideoStandard,
) -> Result<ModeParameter, TvOutError> {
  let req = OverscanRequest::new(h_active, v_active, target);
  req.validate()?;
  let solver = OverscanSolver::new(standard.params())?;

  match solver.best(&req) {
    Some(c) => {
      debug!(
        "{} {}x{}: lines {} h_clki {} h_clko {} ratio {} metric {:.6}",
        standard, h_active, v_active, c.v_linesi, c.h_clki, c.h_clko, c.clk_ratio.value(), c.metric
      );
      Ok(ModeParameter {
        standard,
        h_active,
        v_activei: v_active,
        bpp,
        v_linesi: c.v_linesi,
        h_clki: c.h_clki,
        clk_ratio: c.clk_ratio,
      })
    }
    None => {
      warn!("{} {}x{}: no timing within {:?}", standard, h_active, v_active, solver.window(&req));
      Err(TvOutError::UnsupportedOverscanRequest { standard, width: h_active, height: v_active })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn solve(w: u32, h: u32, target: Overscan, standard: VideoStandard) -> Result<ModeParameter, TvOutError> {
    find_overscan_values(w, h, target, 32, standard)
  }

  fn assert_mode(mode: ModeParameter, lines: u32, h_clki: u32, ratio: ClockRatio) {
    assert_eq!((mode.v_linesi, mode.h_clki, mode.clk_ratio), (lines, h_clki, ratio));
  }

  #[test]
  fn calibration_point() {
    let mode = solve(800, 600, Overscan::PAL, VideoStandard::PalBdghi).unwrap();
    assert_mode(mode, 750, 1420, ClockRatio::ThreeHalves);
    assert_eq!(mode.h_clko(), 2272);
    assert!(mode.rational_error() < RATIONAL_TOLERANCE);
  }

  #[test]
  fn known_solutions() {
    assert_mode(solve(640, 480, Overscan::PAL, VideoStandard::PalBdghi).unwrap(), 600, 950, ClockRatio::Unity);
    assert_mode(solve(720, 576, Overscan::PAL, VideoStandard::PalBdghi).unwrap(), 730, 875, ClockRatio::Unity);
    assert_mode(solve(1024, 576, Overscan::PAL, VideoStandard::PalBdghi).unwrap(), 729, 1250, ClockRatio::Unity);
    assert_mode(solve(640, 480, Overscan::NTSC, VideoStandard::Ntsc).unwrap(), 609, 775, ClockRatio::Unity);
    assert_mode(solve(720, 576, Overscan::NTSC, VideoStandard::Ntsc).unwrap(), 735, 1095, ClockRatio::ThreeHalves);
    assert_mode(solve(800, 600, Overscan::NTSC, VideoStandard::Ntsc).unwrap(), 770, 1170, ClockRatio::ThreeHalves);
  }

  #[test]
  fn window_bounds() {
    let solver = OverscanSolver::new(VideoStandard::PalBdghi.params()).unwrap();
    let window = solver.window(&OverscanRequest::new(800, 600, Overscan::PAL));
    assert_eq!(window, SearchWindow { min_lines: 741, max_lines: 777, min_h_clko: 2223, max_h_clko: 2328 });
  }

  #[test]
  fn unsolvable_request() {
    let target = Overscan { horizontal: 0.0, vertical: 0.5 };
    assert_eq!(
      solve(640, 480, target, VideoStandard::PalBdghi),
      Err(TvOutError::UnsupportedOverscanRequest { standard: VideoStandard::PalBdghi, width: 640, height: 480 })
    );
  }

  #[test]
  fn invalid_targets() {
    let bad = [
      Overscan { horizontal: f64::NAN, vertical: 0.1 },
      Overscan { horizontal: 0.1, vertical: 0.99 },
      Overscan { horizontal: -0.1, vertical: 0.1 },
    ];
    for target in bad {
      assert_eq!(solve(640, 480, target, VideoStandard::Ntsc), Err(TvOutError::InvalidOverscan));
    }
    assert_eq!(solve(0, 480, Overscan::NTSC, VideoStandard::Ntsc), Err(TvOutError::InvalidOverscan));
  }

  #[test]
  fn deterministic() {
    let a = solve(720, 576, Overscan::PAL, VideoStandard::PalNc);
    let b = solve(720, 576, Overscan::PAL, VideoStandard::PalNc);
    assert_eq!(a, b);
  }

  #[test]
  fn best_beats_every_candidate() {
    let solver = OverscanSolver::new(VideoStandard::PalBdghi.params()).unwrap();
    let req = OverscanRequest::new(800, 600, Overscan::PAL);
    let best = solver.best(&req).unwrap();
    let all: Vec<_> = solver.candidates(&req).collect();
    assert_eq!(all.len(), 27);
    assert!(all.iter().all(|c| best.metric <= c.metric));
  }
}
