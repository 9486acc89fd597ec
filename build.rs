use vergen::EmitBuilder;

// Build metadata served by GET /api/version.
fn main() {
    EmitBuilder::builder()
        .build_timestamp()
        .git_sha(true)
        .git_commit_timestamp()
        .emit()
        .expect("Unable to emit build metadata");
}
