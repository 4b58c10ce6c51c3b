use vergen::{vergen, Config};

fn main() {
    // Outside of a git checkout there is no sha to report
    if vergen(Config::default()).is_err() {
        println!("cargo:rustc-env=VERGEN_GIT_SHA=unknown");
    }
}
