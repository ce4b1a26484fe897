use clap::Args;

/// Locations of the external toolchains.
#[derive(Debug, Clone, Args)]
pub struct CompilerCliArgs {
    #[arg(env = "VERIFIER_LIGO_BINARY", long, default_value = "ligo")]
    pub ligo_binary: String,

    #[arg(env = "VERIFIER_OCTEZ_CLIENT_BINARY", long, default_value = "octez-client")]
    pub octez_client_binary: String,

    #[arg(env = "VERIFIER_SMARTPY_BINARY", long, default_value = "SmartPy.sh")]
    pub smartpy_binary: String,

    /// A toolchain that runs longer than this is killed and the file is marked as an error.
    #[arg(env = "VERIFIER_COMPILER_TIMEOUT_SECONDS", long, default_value = "120")]
    pub compiler_timeout_seconds: u64,
}
