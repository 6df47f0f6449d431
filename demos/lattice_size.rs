//! Prints the number of intervals of the ladder lattices up to a given length in the format
//! `length,height,intervals`.
//!
use cladder::lattice::LatticeCache;

fn main() -> anyhow::Result<()> {
    cladder::utils::init_logging();

    let max_length: usize = query::with_default("Max length", "6", Ok);
    let height: usize = query::with_default("Height", "2", Ok);
    let dir: Option<String> = query::optional("Lattice directory", Ok);

    let lattices = LatticeCache::new(dir.map(std::path::PathBuf::from).into());
    for length in 1..=max_length {
        let lattice = lattices.get(length, height)?;
        println!("{length},{height},{}", lattice.len());
    }
    Ok(())
}
