use anyhow::*;
use log::*;
use rayon::prelude::*;
use structopt::*;

use nestjar::*;

#[derive(Debug, StructOpt)]
#[structopt(name = "jarls", about = "Lists the contents of a JAR, and the JARs inside it")]
struct Opt {
    /// Pass multiple times for additional verbosity (info, debug, trace)
    #[structopt(short, long, parse(from_occurrences))]
    verbosity: usize,

    /// Also list every .jar inside the archive, and every .jar inside those...
    #[structopt(short, long)]
    recursive: bool,

    /// Print each archive's main manifest attributes.
    #[structopt(short, long)]
    manifest: bool,

    /// Read every entry, checking its size and CRC.
    #[structopt(short, long)]
    check: bool,

    /// The archive to list, or an entry inside it, like outer.jar!/lib/inner.jar
    #[structopt(name("JAR path"))]
    jar_path: NestedPath,
}

fn main() -> Result<()> {
    let args = Opt::from_args();

    let mut errlog = stderrlog::new();
    errlog.verbosity(args.verbosity + 1);
    errlog.init()?;

    info!("Opening {}", args.jar_path);
    let jar = JarFile::open_nested(&args.jar_path)
        .with_context(|| format!("Couldn't open {}", args.jar_path))?;
    list(&jar, &args)
}

fn list(jar: &JarFile, args: &Opt) -> Result<()> {
    println!("{}:", jar.location());
    if args.manifest {
        if let Some(manifest) = jar.manifest()? {
            for (name, value) in manifest.main_attributes().iter() {
                println!("  {}: {}", name, value);
            }
        }
    }

    for entry in jar.entries() {
        let modified = entry
            .last_modified()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{:>10} {:>10} {:16} {}",
            entry.size(),
            entry.compressed_size(),
            modified,
            entry.name()
        );
    }

    if args.check {
        jar.entries()
            .filter(|e| !e.is_directory())
            .par_bridge()
            .try_for_each(|entry| {
                let mut reader = entry.reader()?;
                std::io::copy(&mut reader, &mut std::io::sink())
                    .with_context(|| format!("Couldn't read {}", entry.name()))?;
                Ok(())
            })?;
    }

    if args.recursive {
        for entry in jar.entries().filter(|e| e.name().ends_with(".jar")) {
            println!();
            let nested = jar
                .nested_jar(entry)
                .with_context(|| format!("Couldn't open {}", entry.name()))?;
            list(&nested, args)?;
        }
    }
    Ok(())
}
