use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=../client/Cargo.toml");
    println!("cargo:rerun-if-changed=../client/src");
    println!("cargo:rerun-if-changed=../client/web/index.html");

    println!("cargo:warning=Building WASM client...");

    // Separate target dir so the nested build does not wait on our lock
    let mut cmd = Command::new("wasm-pack");
    cmd.args(["build", "--target", "web", "--out-dir", "./web/pkg", "--target-dir", "../../target/wasm"])
       .current_dir("../client");

    match cmd.status() {
        Ok(status) if status.success() => {
            println!("cargo:warning=WASM client built successfully - assets will be embedded");
        }
        Ok(status) => {
            println!("cargo:warning=WASM client build failed ({status}); serving without it");
        }
        Err(e) => {
            println!("cargo:warning=wasm-pack not available ({e}); serving without the client");
        }
    }
}
