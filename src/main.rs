#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    vistaxr::app::run()
}

// On wasm the viewer is driven from the host page through the library
// surface, not a binary entry point.
#[cfg(target_arch = "wasm32")]
fn main() {}
