use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src");

    let crate_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap());
    let out = crate_dir.join("include").join("apod.h");

    let result = cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("APOD_FFI_H")
        .generate();

    match result {
        Ok(bindings) => {
            if std::fs::create_dir_all(crate_dir.join("include")).is_ok() {
                bindings.write_to_file(out);
            }
        }
        Err(e) => println!("cargo:warning=cbindgen: {e}"),
    }
}
