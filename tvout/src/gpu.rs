use common::bits::{field, lo8};

use crate::{blanking::BlankingParameter, mode::ModeParameter, program::Program};

/// Offsets into the NV register window.
pub mod nv {
  pub const PMC_INTR_EN: u32 = 0x000140;
  pub const PMC_INTR: u32 = 0x000100;
  pub const PMC_FB_START: u32 = 0x008000;
  pub const PCRTC_INTR_EN: u32 = 0x600140;
  pub const PCRTC_INTR: u32 = 0x600100;
  pub const PCRTC_START: u32 = 0x600800;
  pub const PCRTC_FB_START: u32 = 0x608000;

  pub const RAMDAC_OUTPUT: u32 = 0x680630;
  pub const RAMDAC_BORDER: u32 = 0x68084c;
  pub const RAMDAC_FP_DEBUG: u32 = 0x680880;
  pub const RAMDAC_TG_CONTROL: u32 = 0x680884;
  pub const RAMDAC_TG_DEBUG: u32 = 0x680888;
  pub const RAMDAC_TG_COEFF: [u32; 5] = [0x68088c, 0x680890, 0x680894, 0x680898, 0x68089c];

  pub const VDISPEND: u32 = 0x680800;
  pub const VTOTAL: u32 = 0x680804;
  pub const VCRTC: u32 = 0x680808;
  pub const VSYNCSTART: u32 = 0x68080c;
  pub const VSYNCEND: u32 = 0x680810;
  pub const VVALIDSTART: u32 = 0x680814;
  pub const VVALIDEND: u32 = 0x680818;
  pub const HDISPEND: u32 = 0x680820;
  pub const HTOTAL: u32 = 0x680824;
  pub const HCRTC: u32 = 0x680828;
  pub const HSYNCSTART: u32 = 0x68082c;
  pub const HSYNCEND: u32 = 0x680830;
  pub const HVALIDSTART: u32 = 0x680834;
  pub const HVALIDEND: u32 = 0x680838;
}

/// CRTC register indices.
pub mod crtc {
  pub const HTOTAL: u8 = 0x00;
  pub const HDISPEND: u8 = 0x01;
  pub const HBLANKSTART: u8 = 0x02;
  pub const HBLANKEND: u8 = 0x03;
  pub const HSYNCSTART: u8 = 0x04;
  pub const HSYNCEND: u8 = 0x05;
  pub const VTOTAL: u8 = 0x06;
  pub const OVERFLOW: u8 = 0x07;
  pub const MAX_SCANLINE: u8 = 0x09;
  pub const VSYNCSTART: u8 = 0x10;
  pub const VDISPEND: u8 = 0x12;
  pub const OFFSET: u8 = 0x13;
  pub const UNDERLINE: u8 = 0x14;
  pub const VBLANKSTART: u8 = 0x15;
  pub const VBLANKEND: u8 = 0x16;
  pub const MODE: u8 = 0x17;
  pub const LINECOMP: u8 = 0x18;
  pub const REPAINT0: u8 = 0x19;
  pub const REPAINT1: u8 = 0x1a;
  pub const ARBITRATION0: u8 = 0x1b;
  pub const LOCK: u8 = 0x1f;
  pub const EXTRA: u8 = 0x25;
  pub const PIXEL: u8 = 0x28;
  pub const HEB: u8 = 0x2d;
  pub const HEAD_SELECT: u8 = 0x44;

  pub const UNLOCK_KEY: u8 = 0x57;
}

/// Register level plan for the GPU timing generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuParameter {
  pub xres: u32,
  pub yres: u32,
  pub crtchdispend: u32,
  pub nvhstart: u32,
  pub nvhtotal: u32,
  pub nvvstart: u32,
  pub crtcvstart: u32,
  pub crtcvtotal: u32,
  pub nvvtotal: u32,
  pub pixel_depth: u32,
}

impl GpuParameter {
  pub fn for_tv(mode: &ModeParameter, blanks: &BlankingParameter) -> Self {
    let h_clki = mode.h_clki as i64;
    let v_linesi = mode.v_linesi as i64;
    Self {
      xres: mode.h_active,
      yres: mode.v_activei,
      crtchdispend: mode.h_active + 8,
      nvhstart: (h_clki - blanks.h_blanki as i64 - 7) as u32,
      nvhtotal: (h_clki - 1) as u32,
      nvvstart: (v_linesi - blanks.v_blanki as i64 + 1) as u32,
      crtcvstart: mode.v_activei + 32,
      crtcvtotal: mode.v_linesi + 32,
      nvvtotal: (v_linesi - 1) as u32,
      pixel_depth: mode.pixel_depth(),
    }
  }

  /// 800x600 at 56 Hz, 35 kHz line rate.
  pub fn vga_800x600() -> Self {
    let (xres, nvvstart, crtcvtotal) = (800, 614, 630);
    Self {
      xres,
      yres: 600,
      crtchdispend: xres,
      nvhstart: 900,
      nvhtotal: 1028,
      nvvstart,
      crtcvstart: nvvstart,
      crtcvtotal,
      nvvtotal: crtcvtotal,
      pixel_depth: 4,
    }
  }
}

/// Encoder PLL integer divider that pairs with [`GpuParameter::vga_800x600`].
pub const VGA_800X600_PLL_INT: u8 = 0x10;

pub fn gpu_program(gpu: &GpuParameter) -> Program {
  let mut p = Program::new();
  let f = |v: u32, shift: i32, mask: u8| field(v as i64, shift, mask);
  let b = |v: u32| lo8(v as i64);

  let htotal = gpu.nvhtotal;
  let dispend = gpu.crtchdispend;
  let last_line = gpu.yres.wrapping_sub(1);

  p.write32(nv::HDISPEND, dispend.wrapping_sub(1))
    .write32(nv::HTOTAL, htotal)
    .write32(nv::HCRTC, gpu.xres.wrapping_sub(1))
    .write32(nv::HVALIDSTART, 0)
    .write32(nv::HSYNCSTART, gpu.nvhstart)
    .write32(nv::HSYNCEND, gpu.nvhstart + 32)
    .write32(nv::HVALIDEND, gpu.xres.wrapping_sub(1));

  // CRTC sync starts 32 clocks before the total and lasts 16
  let hsync = htotal.wrapping_sub(32);
  p.crtc(crtc::HSYNCSTART, b(hsync / 8))
    .crtc_update(crtc::HSYNCEND, 0x1f, b((hsync + 16) / 8 - 1))
    .crtc(crtc::HTOTAL, b((htotal / 8).wrapping_sub(5)))
    .crtc(crtc::HBLANKSTART, b((dispend / 8).wrapping_sub(1)))
    .crtc_update(crtc::HBLANKEND, 0x1f, b((htotal / 8).wrapping_sub(1)))
    .crtc_update(crtc::HSYNCEND, 0x80, f((htotal / 8).wrapping_sub(1) & 0x20, -2, 0x80));

  // display end is write protected while bit 7 of the mode register is set
  p.crtc_update(crtc::MODE, 0x80, 0x00)
    .crtc(crtc::HDISPEND, b((dispend / 8).wrapping_sub(1)))
    .crtc(crtc::HBLANKSTART, b((dispend / 8).wrapping_sub(1)))
    .crtc_update(crtc::MODE, 0x80, 0x80);

  let stride = (gpu.xres / 8) * gpu.pixel_depth;
  p.crtc_update(crtc::REPAINT0, 0xe0, f(stride, 3, 0xe0))
    .crtc(crtc::OFFSET, b(stride));

  p.write32(nv::VDISPEND, last_line)
    .write32(nv::VTOTAL, gpu.nvvtotal)
    .write32(nv::VCRTC, last_line)
    .write32(nv::VVALIDSTART, 0)
    .write32(nv::VSYNCSTART, gpu.nvvstart)
    .write32(nv::VSYNCEND, gpu.nvvstart + 3)
    .write32(nv::VVALIDEND, last_line);

  let vstart = gpu.crtcvstart;
  let vtotal = gpu.crtcvtotal;
  p.crtc_update(crtc::OVERFLOW, 0x84, f(vstart, 2, 0x80) | f(vstart, 6, 0x04))
    .crtc(crtc::VSYNCSTART, b(vstart))
    .crtc_update(crtc::OVERFLOW, 0x21, f(vtotal, 4, 0x20) | f(vtotal, 8, 0x01))
    .crtc(crtc::VTOTAL, b(vtotal))
    .crtc_update(crtc::VBLANKEND, 0x7f, b(vtotal))
    .crtc_update(crtc::OVERFLOW, 0x42, f(last_line, 3, 0x40) | f(last_line, 7, 0x02))
    .crtc(crtc::VDISPEND, b(last_line))
    .crtc_update(crtc::MAX_SCANLINE, 0x20, f(last_line, 4, 0x20))
    .crtc_update(crtc::OVERFLOW, 0x08, f(last_line, 5, 0x08))
    .crtc(crtc::VBLANKSTART, b(last_line));

  // line compare 0x3ff disables the split screen
  let linecomp = 0x3ff;
  p.crtc_update(crtc::OVERFLOW, 0x10, f(linecomp, 4, 0x10))
    .crtc_update(crtc::MAX_SCANLINE, 0x40, f(linecomp, 3, 0x40))
    .crtc(crtc::LINECOMP, b(linecomp));

  p.crtc(crtc::REPAINT1, if gpu.xres < 1280 { 0x04 } else { 0x00 });

  let htotal_chars = (htotal / 8).wrapping_sub(5);
  let extra = f(htotal_chars & 0x040, 2, 0xff)
    | f(last_line & 0x400, 7, 0xff)
    | f(vstart & 0x400, 8, 0xff)
    | f(last_line & 0x400, 9, 0xff)
    | f(vtotal & 0x400, 10, 0xff);
  p.crtc(crtc::EXTRA, extra);

  // TV pixel mode
  p.crtc(crtc::PIXEL, (gpu.pixel_depth.min(3) as u8) | 0x80);
  p.crtc_update(crtc::HEB, 0x1f, if (htotal / 8).wrapping_sub(1) >= 260 { 0x01 } else { 0x00 });

  p
}
