mod test_utilities;
use assert_cmd::{Command, cargo};
use test_utilities::{pad_corpus, write_dem};

#[test]
fn generate_produces_brotli_tiles_and_a_manifest() {
	let source = tempfile::tempdir().unwrap();
	let output = tempfile::tempdir().unwrap();

	write_dem(
		source.path(),
		"n27_w083_1arc_v3",
		100,
		64,
		64,
		(-83.0007, -81.9993, 26.9993, 28.0007),
	);
	pad_corpus(source.path(), 100);

	Command::new(cargo::cargo_bin!())
		.args([
			"generate",
			"--source-dir",
			source.path().to_str().unwrap(),
			"--output-dir",
			output.path().to_str().unwrap(),
			"--zoom-min",
			"9",
			"--zoom-max",
			"9",
			"--bbox",
			"-83.0",
			"27.0",
			"-82.0",
			"28.0",
			"--workers",
			"2",
		])
		.assert()
		.success();

	let manifest_path = output.path().join("manifest.json");
	assert!(manifest_path.exists(), "generator should write manifest.json");

	let manifest_text = std::fs::read_to_string(&manifest_path).unwrap();
	let manifest: serde_json::Value = serde_json::from_str(&manifest_text).unwrap();
	let written = manifest["per_zoom"]["9"]["written"].as_u64().unwrap();
	assert!(written >= 1, "expected at least one tile written, got manifest: {manifest}");

	// at least one .br tile should now exist under the zoom-9 tree
	let zoom_dir = output.path().join("9");
	let has_brotli_tile = walk_has_extension(&zoom_dir, ".br");
	assert!(has_brotli_tile, "expected at least one .u16.br tile under {}", zoom_dir.display());
}

#[test]
fn generate_is_resumable_and_skips_existing_tiles_on_rerun() {
	let source = tempfile::tempdir().unwrap();
	let output = tempfile::tempdir().unwrap();

	write_dem(
		source.path(),
		"n27_w083_1arc_v3",
		100,
		64,
		64,
		(-83.0007, -81.9993, 26.9993, 28.0007),
	);
	pad_corpus(source.path(), 100);

	let args = [
		"generate",
		"--source-dir",
		source.path().to_str().unwrap(),
		"--output-dir",
		output.path().to_str().unwrap(),
		"--zoom-min",
		"9",
		"--zoom-max",
		"9",
		"--bbox",
		"-83.0",
		"27.0",
		"-82.0",
		"28.0",
	];

	Command::new(cargo::cargo_bin!()).args(args).assert().success();
	Command::new(cargo::cargo_bin!()).args(args).assert().success();

	let manifest_text = std::fs::read_to_string(output.path().join("manifest.json")).unwrap();
	let manifest: serde_json::Value = serde_json::from_str(&manifest_text).unwrap();
	let skipped = manifest["per_zoom"]["9"]["skipped_existing"].as_u64().unwrap();
	assert!(skipped >= 1, "second run should have skipped already-written tiles, got manifest: {manifest}");
}

fn walk_has_extension(dir: &std::path::Path, suffix: &str) -> bool {
	let Ok(entries) = std::fs::read_dir(dir) else { return false };
	for entry in entries.flatten() {
		let path = entry.path();
		if path.is_dir() {
			if walk_has_extension(&path, suffix) {
				return true;
			}
		} else if path.to_string_lossy().ends_with(suffix) {
			return true;
		}
	}
	false
}
