use std::io::Write;

use assert_cmd::Command;
use tempfile::NamedTempFile;

fn tvout(args: &[&str]) -> (bool, String) {
  let out = Command::cargo_bin("tvout").unwrap().args(args).output().unwrap();
  (out.status.success(), String::from_utf8(out.stdout).unwrap())
}

fn profile(yaml: &str) -> NamedTempFile {
  let mut f = NamedTempFile::new().unwrap();
  f.write_all(yaml.as_bytes()).unwrap();
  f
}

#[test]
fn solve_ntsc_480() {
  let (ok, out) = tvout(&["solve", "720x480", "--standard", "ntsc"]);
  assert!(ok);
  assert!(out.contains("h_blanko    439"), "{}", out);
  assert!(out.contains("vscale      5454"), "{}", out);
  assert!(out.contains("fifo        Balanced"), "{}", out);
}

#[test]
fn solve_rejects_impossible_target() {
  let (ok, _) = tvout(&["solve", "640x480", "-s", "pal", "--horizontal", "0", "--vertical", "0.5"]);
  assert!(!ok);
}

#[test]
fn solve_rejects_bad_arguments() {
  assert!(!tvout(&["solve", "640", "-s", "pal"]).0);
  assert!(!tvout(&["solve", "640x480", "-s", "secam"]).0);
}

#[test]
fn boot_profile() {
  let f = profile("video_mode: 3\nhardware:\n  av_pack: \"0x06\"\n  region: \"0x80\"\n");
  let path = f.path().to_str().unwrap();
  let (ok, out) = tvout(&["boot", path]);
  assert!(ok);
  assert!(out.contains("PAL-BDGHI"), "{}", out);
  assert!(out.contains("composite"), "{}", out);
  assert!(out.contains("brightness  81 49 8c"), "{}", out);
  assert!(out.contains("crc32"), "{}", out);

  let (_, again) = tvout(&["boot", path]);
  assert_eq!(out, again);
}

#[test]
fn boot_trace() {
  let f = profile("connector: vga\n");
  let (ok, out) = tvout(&["boot", "--trace", f.path().to_str().unwrap()]);
  assert!(ok);
  assert!(out.contains("port  out  80d3   <- 05"), "{}", out);
  assert!(out.contains("port  out  80d3   <- 04"), "{}", out);
  assert!(out.contains("vga 800x600"), "{}", out);
}

#[test]
fn boot_skipped_request_still_succeeds() {
  let f = profile("video_mode: 0\nstandard: pal\noverscan: { horizontal: 0.0, vertical: 0.5 }\n");
  let (ok, out) = tvout(&["boot", f.path().to_str().unwrap()]);
  assert!(ok);
  assert!(out.contains("skipped"), "{}", out);
}

#[test]
fn boot_rejects_bad_profiles() {
  let bad_mode = profile("video_mode: 9\n");
  assert!(!tvout(&["boot", bad_mode.path().to_str().unwrap()]).0);
  let bad_key = profile("resolution: 800x600\n");
  assert!(!tvout(&["boot", bad_key.path().to_str().unwrap()]).0);
  assert!(!tvout(&["boot", "does/not/exist.yaml"]).0);
}

#[test]
fn sweep_solves_everything() {
  let (ok, out) = tvout(&["sweep"]);
  assert!(ok);
  assert!(out.contains("35 solved, 0 failed"), "{}", out);
}

#[test]
fn program_listing() {
  let (ok, out) = tvout(&["program", "1024x576", "-s", "pal", "-f", "0x3c00000"]);
  assert!(ok);
  assert!(out.contains("mmio  600800 = 03c00000"), "{}", out);
  assert!(out.contains("bus   45:60 = c7"), "{}", out);
}
