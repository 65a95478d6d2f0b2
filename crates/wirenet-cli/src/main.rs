use clap::{Parser, Subcommand};

mod list;
mod netlist;
mod nets;
mod project;
mod ui;

#[derive(Parser)]
#[command(name = "wirenet")]
#[command(about = "Resolve schematic nets and write hierarchical netlists", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the netlist of a cell and everything below it
    #[command(alias = "n")]
    Netlist(netlist::NetlistArgs),

    /// Show the resolved nets and pin bindings of one schematic
    Nets(nets::NetsArgs),

    /// List libraries, cells and views
    #[command(alias = "ls")]
    List(list::ListArgs),
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Netlist(args) => netlist::execute(args),
        Commands::Nets(args) => nets::execute(args),
        Commands::List(args) => list::execute(args),
    }
}
