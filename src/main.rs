extern crate clap;
extern crate pbr;

use clap::{Parser, ValueEnum};
use pbr::ProgressBar;
use serde::Serialize;
use std::time::Instant;
use x_blossom::csr_graph::CsrGraph;
use x_blossom::matching_serial::*;
use x_blossom::mcm_solver::*;
use x_blossom::util::*;

#[derive(Parser, Clone)]
#[clap(author = clap::crate_authors!(", "), version = env!("CARGO_PKG_VERSION")
    , about = "X-Blossom parallel maximum matching on general graphs", long_about = None)]
pub struct Cli {
    /// whitespace-separated CSR row offset file, n+1 integers
    #[clap(value_parser)]
    row_offsets_path: String,
    /// whitespace-separated CSR column index file, one entry per arc
    #[clap(value_parser)]
    col_indices_path: String,
    /// number of worker threads
    #[clap(value_parser)]
    num_threads: usize,
    /// the method to verify the cardinality of the matching (symmetry is always checked)
    #[clap(long, arg_enum, default_value_t = Verifier::None)]
    verifier: Verifier,
    /// repeat the solve to benchmark the parallel speed
    #[clap(short = 't', long, default_value_t = 1)]
    total_rounds: usize,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Serialize, Debug)]
pub enum Verifier {
    /// disable verifier
    None,
    /// compare the cardinality with the sequential blossom implementation
    Serial,
}

impl Cli {
    pub fn run(self) -> Result<(), String> {
        let graph = CsrGraph::from_files(&self.row_offsets_path, &self.col_indices_path)
            .map_err(|error| error.to_string())?;
        graph.sanity_check()?;
        println!("the graph has {} vertices and {} edges", graph.num_vertices(), graph.num_edges());
        let mut solver =
            SolverParallel::new(&graph, SolverConfig::new(self.num_threads)).map_err(|error| error.to_string())?;
        let begin = Instant::now();
        let matching = solver.solve();
        println!("solved in {:.3}s with {} threads", begin.elapsed().as_secs_f64(), self.num_threads);
        if self.total_rounds > 1 {
            let mut pb = ProgressBar::on(std::io::stderr(), self.total_rounds as u64);
            let begin = Instant::now();
            for round in 0..(self.total_rounds as u64) {
                pb.set(round);
                solver.solve();
            }
            pb.finish();
            println!(
                "benchmark: {} rounds, {:.3}s per solve",
                self.total_rounds,
                begin.elapsed().as_secs_f64() / self.total_rounds as f64
            );
        }
        let cardinality = verify_matching(&graph, &matching)?;
        println!("the matching is valid and the matching size is {}", cardinality);
        if matches!(self.verifier, Verifier::Serial) {
            let expected = matching_cardinality(&serial_maximum_matching(&graph));
            if cardinality != expected {
                return Err(format!(
                    "verifier mismatch: parallel cardinality {} but serial reference found {}",
                    cardinality, expected
                ));
            }
            println!("serial verifier agrees");
        }
        Ok(())
    }
}

pub fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            match error.kind() {
                clap::ErrorKind::DisplayHelp | clap::ErrorKind::DisplayVersion => std::process::exit(0),
                _ => std::process::exit(1),
            }
        }
    };
    if let Err(message) = cli.run() {
        eprintln!("error: {}", message);
        std::process::exit(1);
    }
}
