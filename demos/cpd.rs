//! Computes the connected persistence diagram of a filtration and prints its dots and lines in
//! the format `x,y,multiplicity,area` and `x0,y0,x1,y1,multiplicity`.
//!
use std::{fs::File, io::BufReader};

use anyhow::Context;
use cladder::{
    cpd::CPDAssembler, filtration::CLFiltration, lattice::LatticeCache, utils::Config, FastZigzag,
};

fn main() -> anyhow::Result<()> {
    cladder::utils::init_logging();

    let path: String = query::raw("Filtration file (text format)", Ok);
    let values: Vec<f64> = query::list("Filtration values", Ok);
    let dim = query::with_default("Homological dimension", "1", Ok);

    let file = File::open(&path).with_context(|| format!("Failed to open {path}"))?;
    let filtration = CLFiltration::parse_text(BufReader::new(file), values)?;

    let config = Config::from_env();
    let lattices = LatticeCache::new(config.lattice_dir.clone());
    let cpd = CPDAssembler::new(&config, &lattices, &FastZigzag).assemble(&filtration, dim)?;

    println!("# dots");
    for dot in &cpd.dots {
        println!("{},{},{},{}", dot.x, dot.y, dot.multiplicity, dot.area);
    }
    println!("# lines");
    for line in &cpd.lines {
        println!(
            "{},{},{},{},{}",
            line.x0, line.y0, line.x1, line.y1, line.multiplicity
        );
    }
    Ok(())
}
