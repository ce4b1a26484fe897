use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};
use provider::aws::AWSConfigCliArgs;
pub use service::ServiceCliArgs as ServiceParams;

use crate::types::task::TaskKind;

pub mod chain;
pub mod compiler;
pub mod database;
pub mod provider;
pub mod queue;
pub mod service;
pub mod storage;

#[derive(Parser, Debug)]
#[command(
    name = "contract-verifier",
    about = "Compiles Tezos smart contract sources and verifies them against deployed code",
    after_help = "Examples:\n  \
    contract-verifier setup --aws --aws-s3 --rabbitmq --mongodb\n  \
    contract-verifier run --aws --aws-s3 --rabbitmq --mongodb\n  \
    contract-verifier submit --aws --aws-s3 --rabbitmq --mongodb --kind verification \\\n    \
    --address KT1... --file ./contract.tz"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the compilation worker and the deployment reconciliation loop
    Run {
        #[command(flatten)]
        run_command: Box<RunCmd>,
    },
    /// Declare the queue topology, the artifact bucket and the database indexes
    Setup {
        #[command(flatten)]
        setup_command: Box<SetupCmd>,
    },
    /// Create a task from local files or a repository and enqueue it
    Submit {
        #[command(flatten)]
        submit_command: Box<SubmitCmd>,
    },
    /// Record the broadcast origination of a deployment task
    RegisterDeployment {
        #[command(flatten)]
        register_command: Box<RegisterDeploymentCmd>,
    },
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[clap(
    group(
        ArgGroup::new("provider")
            .args(&["aws"])
            .required(true)
            .multiple(false)
    ),
    group(
        ArgGroup::new("storage")
            .args(&["aws_s3"])
            .required(true)
            .multiple(false)
            .requires("provider")
    ),
    group(
        ArgGroup::new("queue")
            .args(&["rabbitmq", "in_memory_queue"])
            .required(true)
            .multiple(false)
    ),
    group(
        ArgGroup::new("database")
            .args(&["mongodb"])
            .required(true)
            .multiple(false)
    ),
)]
pub struct RunCmd {
    // AWS Config
    #[clap(flatten)]
    pub aws_config_args: AWSConfigCliArgs,

    // Storage
    #[clap(flatten)]
    pub aws_s3_args: storage::aws_s3::AWSS3CliArgs,

    // Queue
    #[clap(flatten)]
    pub rabbitmq_args: queue::rabbitmq::RabbitMQCliArgs,

    #[clap(flatten)]
    pub in_memory_queue_args: queue::in_memory::InMemoryQueueCliArgs,

    // Database
    #[clap(flatten)]
    pub mongodb_args: database::mongodb::MongoDBCliArgs,

    // Chain
    #[clap(flatten)]
    pub tezos_args: chain::tezos::TezosCliArgs,

    // Compilers
    #[clap(flatten)]
    pub compiler_args: compiler::CompilerCliArgs,

    // Service
    #[clap(flatten)]
    pub service_args: service::ServiceCliArgs,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[clap(
    group(
        ArgGroup::new("provider")
            .args(&["aws"])
            .required(true)
            .multiple(false)
    ),
    group(
        ArgGroup::new("storage")
            .args(&["aws_s3"])
            .required(true)
            .multiple(false)
            .requires("provider")
    ),
    group(
        ArgGroup::new("queue")
            .args(&["rabbitmq"])
            .required(true)
            .multiple(false)
    ),
)]
pub struct SetupCmd {
    // AWS Config
    #[clap(flatten)]
    pub aws_config_args: AWSConfigCliArgs,

    // Storage
    #[clap(flatten)]
    pub aws_s3_args: storage::aws_s3::AWSS3CliArgs,

    // Queue
    #[clap(flatten)]
    pub rabbitmq_args: queue::rabbitmq::RabbitMQCliArgs,

    // Database
    #[clap(flatten)]
    pub mongodb_args: database::mongodb::MongoDBCliArgs,

    /// Services whose queues should be declared and bound.
    #[arg(env = "VERIFIER_SETUP_SERVICES", long, value_delimiter = ',', default_value = "compiler")]
    pub services: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
#[clap(group(ArgGroup::new("sources").args(&["files", "repository"]).required(true).multiple(false)))]
pub struct SubmitCmd {
    #[clap(flatten)]
    pub run_args: RunCmd,

    #[arg(long, value_enum)]
    pub kind: TaskKind,

    /// Deployed contract a verification task is checked against.
    #[arg(long, required_if_eq("kind", "verification"))]
    pub address: Option<String>,

    /// Network of `--address`. Defaults to the configured Tezos network.
    #[arg(long)]
    pub network: Option<String>,

    #[arg(long)]
    pub user_id: Option<String>,

    /// Local source file, may be repeated.
    #[arg(long = "file")]
    pub files: Vec<PathBuf>,

    /// Repository as `owner/repo`.
    #[arg(long)]
    pub repository: Option<String>,

    /// Branch, tag or commit of `--repository`.
    #[arg(long = "ref", default_value = "main")]
    pub reference: String,
}

#[derive(Parser, Debug, Clone)]
pub struct RegisterDeploymentCmd {
    #[clap(flatten)]
    pub run_args: RunCmd,

    #[arg(long)]
    pub task_id: u64,

    #[arg(long)]
    pub operation_hash: String,
}
