use std::env;

fn main() {
    // Iteration count is a build-time knob, not a runtime flag.
    let iters = env::var("STORE_ORDER_ITERS").unwrap_or_else(|_| "128".to_string());
    let parsed: usize = iters
        .parse()
        .expect("STORE_ORDER_ITERS must be a positive integer");
    assert!(parsed > 0, "STORE_ORDER_ITERS must be a positive integer");

    println!("cargo:rustc-env=STORE_ORDER_ITERS={}", parsed);
    println!("cargo:rerun-if-env-changed=STORE_ORDER_ITERS");
}
