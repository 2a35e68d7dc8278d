use std::env;

fn main() {
    println!("cargo:rerun-if-changed=src");
    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());

    // Header generation is best effort; the library builds without it.
    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("TABLEHTTP_H")
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(format!("{crate_dir}/include/tablehttp.h"));
        }
        Err(err) => println!("cargo:warning=skipping C header generation: {err}"),
    }
}
