use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use clap::{load_yaml, value_t, App, ArgMatches};
use cladder::{
    cpd::CPDAssembler,
    filtration::CLFiltration,
    finite_type::TotalDecomposer,
    lattice::LatticeCache,
    utils::{init_logging, Config},
    FastZigzag,
};
use fp::prime::ValidPrime;

fn main() -> anyhow::Result<()> {
    init_logging();
    let yaml = load_yaml!("cli.yml");
    let matches = App::from_yaml(yaml).get_matches();
    println!("{}", run(&matches)?);
    Ok(())
}

/// Runs the chosen subcommand and returns its JSON output.
fn run(matches: &ArgMatches<'_>) -> anyhow::Result<String> {
    match matches.subcommand() {
        ("cpd", Some(sub)) => {
            let config = get_config(sub)?;
            let lattices = LatticeCache::new(config.lattice_dir.clone());
            let filtration = read_filtration(sub)?;
            let dim = value_t!(sub, "dim", usize)?;
            let cpd = CPDAssembler::new(&config, &lattices, &FastZigzag)
                .assemble(&filtration, dim)
                .context("Failed to compute the connected persistence diagram")?;
            Ok(serde_json::to_string_pretty(&cpd)?)
        }
        ("decompose", Some(sub)) => {
            let config = get_config(sub)?;
            let lattices = LatticeCache::new(config.lattice_dir.clone());
            let filtration = read_filtration(sub)?;
            let dim = value_t!(sub, "dim", usize)?;
            let decomposition = TotalDecomposer::new(&config, &lattices, &FastZigzag)
                .decompose(&filtration, dim, config.prime)
                .context("Failed to decompose the filtration")?;
            tracing::info!("{}", decomposition.statistics());
            Ok(serde_json::to_string_pretty(&decomposition)?)
        }
        ("lattice", Some(sub)) => {
            let config = get_config(sub)?;
            let lattices = LatticeCache::new(config.lattice_dir);
            let length = value_t!(sub, "length", usize)?;
            let height = value_t!(sub, "height", usize)?;
            let lattice = lattices.get(length, height)?;
            Ok(serde_json::to_string_pretty(&serde_json::json!({
                "length": length,
                "height": height,
                "intervals": lattice.len(),
            }))?)
        }
        (name, _) => Err(anyhow!("Unknown subcommand {name:?}")),
    }
}

fn get_config(matches: &ArgMatches<'_>) -> anyhow::Result<Config> {
    let mut config = Config::from_env();
    if matches.is_present("threads") {
        config = config.with_threads(value_t!(matches, "threads", usize)?);
    }
    let prime: u32 = value_t!(matches, "prime", u32)?;
    config = config.with_prime(ValidPrime::try_from(prime).context("Invalid prime")?);
    config.lattice_dir = matches.value_of("lattice_dir").map(PathBuf::from).into();
    Ok(config)
}

fn read_filtration(matches: &ArgMatches<'_>) -> anyhow::Result<CLFiltration> {
    let path = Path::new(
        matches
            .value_of("filtration")
            .ok_or_else(|| anyhow!("No filtration given"))?,
    );
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let parse = || -> anyhow::Result<CLFiltration> {
        if path.extension().is_some_and(|ext| ext == "json") {
            return Ok(serde_json::from_reader(reader)?);
        }
        let values = matches
            .value_of("values")
            .ok_or_else(|| anyhow!("--values is required for text input"))?
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .context("Invalid filtration values")?;
        Ok(CLFiltration::parse_text(reader, values)?)
    };
    parse().with_context(|| format!("Failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    const SIX_POINTS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/six_points.txt");
    const VALUES: &str = "0.17399216,0.35642443,0.38279749,0.38289977";

    fn cladder(args: &[&str]) -> anyhow::Result<Value> {
        let yaml = load_yaml!("cli.yml");
        let matches = App::from_yaml(yaml)
            .get_matches_from_safe(std::iter::once("cladder").chain(args.iter().copied()))?;
        Ok(serde_json::from_str(&run(&matches)?)?)
    }

    #[test]
    fn decompose() {
        let out = cladder(&["decompose", SIX_POINTS, "--values", VALUES, "--threads", "1"]).unwrap();
        assert_eq!(out, json!({ "mult": { "N1": 1 }, "dim": 1, "prime": 2 }));

        let out = cladder(&["-p", "3", "decompose", SIX_POINTS, "--values", VALUES, "-d", "0"])
            .unwrap();
        assert_eq!(
            out,
            json!({ "mult": { "I11": 1, "I21": 2, "I30": 1 }, "dim": 0, "prime": 3 })
        );
    }

    #[test]
    fn cpd() {
        let out = cladder(&["cpd", SIX_POINTS, "--values", VALUES, "-d", "0"]).unwrap();
        assert_eq!(out["ladder_length"], 4);
        assert_eq!(out["dim"], 0);
        assert_eq!(out["radii"].as_array().map(Vec::len), Some(4));
    }

    #[test]
    fn lattice() {
        let out = cladder(&["lattice", "3"]).unwrap();
        assert_eq!(out, json!({ "length": 3, "height": 2, "intervals": 27 }));
    }

    #[test]
    fn bad_arguments() {
        let err = cladder(&["cpd", SIX_POINTS]).unwrap_err();
        assert!(format!("{err:#}").contains("--values is required"), "{err:#}");

        let err = cladder(&["-p", "4", "lattice", "3"]).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid prime"), "{err:#}");

        assert!(cladder(&["cpd"]).is_err());
    }
}
