//! Computes the total decomposition of a filtration of length 3 or 4 in every dimension up to a
//! maximum and prints the nonzero multiplicities together with the non-interval scores.
//!
use std::{fs::File, io::BufReader};

use anyhow::Context;
use cladder::{
    filtration::CLFiltration,
    finite_type::{LadderQuiver, TotalDecomposer},
    lattice::LatticeCache,
    utils::Config,
    FastZigzag,
};
use fp::prime::ValidPrime;

fn main() -> anyhow::Result<()> {
    cladder::utils::init_logging();

    let path: String = query::raw("Filtration file (text format)", Ok);
    let values: Vec<f64> = query::list("Filtration values", Ok);
    let max_dim: usize = query::with_default("Max dimension", "1", Ok);
    let prime = query::with_default("Prime", "2", |p: u32| {
        ValidPrime::try_from(p).map_err(|e| e.to_string())
    });

    let file = File::open(&path).with_context(|| format!("Failed to open {path}"))?;
    let filtration = CLFiltration::parse_text(BufReader::new(file), values)?;

    let config = Config::from_env().with_prime(prime);
    let lattices = LatticeCache::new(config.lattice_dir.clone());
    let mut quiver = LadderQuiver::new(
        &filtration,
        TotalDecomposer::new(&config, &lattices, &FastZigzag),
    )?;

    for dim in 0..=max_dim {
        let decomposition = quiver.multiplicity_computation(dim, prime, false)?;
        println!("H{dim}: {decomposition}");
        println!("    {}", decomposition.statistics());
        if let Ok(score) = decomposition.ns_const() {
            println!("    ns_const: {score:.4}");
        }
    }
    Ok(())
}
