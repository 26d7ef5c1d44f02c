/// Builds the gRPC client and server code for `proto/geoip.proto` using
/// `tonic-prost-build`.
///
/// Besides the message and service bindings, a serialized
/// `FileDescriptorSet` is written to `OUT_DIR/geoip_descriptor.bin` so the
/// server can expose gRPC reflection.
///
/// # Files and Paths
///
/// - Proto file: `proto/geoip.proto`
/// - Includes: `proto/`
///
/// # Panics
///
/// Panics if `OUT_DIR` is unset or code generation fails (for example when
/// `protoc` is not installed).
///
/// # Output
///
/// Generated code is pulled in with:
///
/// ```rust,ignore
/// pub mod proto {
///     tonic::include_proto!("geoip");
/// }
/// ```
use std::env;
use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("geoip_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    println!("cargo:rerun-if-changed=proto/geoip.proto");

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/geoip.proto"], &["proto"])
        .unwrap();
}
