//! CLI utility for navigation mesh tile stores

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use navmesh_common::{InputHash, TilePosition};
use navmesh_db::NavMeshDb;

/// A CLI utility to inspect and maintain navigation mesh tile stores
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the number of stored tiles and the largest tile id
    Info {
        /// Tile store file
        #[clap(long, value_parser)]
        db: PathBuf,
    },

    /// Look up a stored tile by region, tile position and build input
    Find {
        /// Tile store file
        #[clap(long, value_parser)]
        db: PathBuf,

        /// World region the tile belongs to
        #[clap(long)]
        region: String,

        /// Tile position (x,y)
        #[clap(long, value_parser = parse_tile_position, allow_hyphen_values = true)]
        tile: TilePosition,

        /// File holding the build input, hashed with SHA-256
        #[clap(long, value_parser, required_unless_present = "hash")]
        input: Option<PathBuf>,

        /// Hex encoded SHA-256 of the build input
        #[clap(long, value_parser = parse_hash, conflicts_with = "input")]
        hash: Option<InputHash>,

        /// Write the tile data to this file
        #[clap(long, value_parser)]
        output: Option<PathBuf>,
    },

    /// Delete every stored tile of a region at a tile position
    Remove {
        /// Tile store file
        #[clap(long, value_parser)]
        db: PathBuf,

        /// World region the tiles belong to
        #[clap(long)]
        region: String,

        /// Tile position (x,y)
        #[clap(long, value_parser = parse_tile_position, allow_hyphen_values = true)]
        tile: TilePosition,
    },

    /// Rewrite the store file without superseded records
    Compact {
        /// Tile store file
        #[clap(long, value_parser)]
        db: PathBuf,
    },
}

/// Parse a comma-separated tile position
fn parse_tile_position(s: &str) -> Result<TilePosition, String> {
    let parts: Vec<&str> = s.split(',').collect();

    if parts.len() != 2 {
        return Err(format!(
            "Tile position must have 2 components, got {}",
            parts.len()
        ));
    }

    let x = parts[0].trim().parse::<i32>().map_err(|e| e.to_string())?;
    let y = parts[1].trim().parse::<i32>().map_err(|e| e.to_string())?;

    Ok(TilePosition::new(x, y))
}

/// Parse a hex encoded SHA-256 digest
fn parse_hash(s: &str) -> Result<InputHash, String> {
    if s.len() != 64 {
        return Err(format!("Hash must be 64 hex digits, got {} characters", s.len()));
    }
    if let Some(c) = s.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(format!("Hash must be 64 hex digits, found {:?}", c));
    }

    let mut bytes = [0u8; 32];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&s[2 * i..2 * i + 2], 16).map_err(|e| e.to_string())?;
    }

    Ok(InputHash(bytes))
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Info { db } => info(&db),
        Commands::Find {
            db,
            region,
            tile,
            input,
            hash,
            output,
        } => {
            let hash = match (hash, input) {
                (Some(hash), _) => hash,
                (None, Some(input)) => {
                    let bytes = std::fs::read(&input)
                        .with_context(|| format!("Failed to read input file: {}", input.display()))?;
                    InputHash::of(&bytes)
                }
                (None, None) => return Err(anyhow!("Either --input or --hash is required")),
            };
            find(&db, &region, tile, &hash, output.as_deref())
        }
        Commands::Remove { db, region, tile } => remove(&db, &region, tile),
        Commands::Compact { db } => compact(&db),
    }
}

fn open_store(path: &Path) -> Result<NavMeshDb> {
    if !path.exists() {
        return Err(anyhow!("Tile store not found: {}", path.display()));
    }
    NavMeshDb::open(path).map_err(|e| anyhow!("Failed to open tile store {}: {}", path.display(), e))
}

/// Print store summary
fn info(path: &Path) -> Result<()> {
    let db = open_store(path)?;

    println!("Tile store: {}", path.display());
    println!("Tiles: {}", db.tile_count());
    println!("Max tile id: {}", db.get_max_tile_id());
    println!("File size: {} bytes", db.file_size());

    Ok(())
}

/// Look up one tile
fn find(path: &Path, region: &str, tile: TilePosition, hash: &InputHash, output: Option<&Path>) -> Result<()> {
    let db = open_store(path)?;

    println!("Looking up tile {} of region '{}' with input {}...", tile, region, hash);

    let Some(tile_data) = db.get_tile_data(region, tile, hash) else {
        println!("Tile not found");
        return Ok(());
    };

    println!("Found tile {}", tile_data.tile_id);
    println!("Version: {}", tile_data.version.0);
    println!("Data size: {} bytes", tile_data.data.len());

    if let Some(output_path) = output {
        println!("Saving tile data to {}...", output_path.display());

        let mut file = File::create(output_path)
            .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;
        file.write_all(&tile_data.data)?;
    }

    Ok(())
}

/// Delete tiles at one position
fn remove(path: &Path, region: &str, tile: TilePosition) -> Result<()> {
    let mut db = open_store(path)?;

    let removed = db
        .delete_tiles_at(region, tile)
        .map_err(|e| anyhow!("Failed to remove tiles: {}", e))?;

    println!("Removed {} tiles at {} of region '{}'", removed, tile, region);

    Ok(())
}

/// Rewrite the store file
fn compact(path: &Path) -> Result<()> {
    let mut db = open_store(path)?;
    let before = db.file_size();

    println!("Compacting {} tiles...", db.tile_count());
    db.compact()
        .map_err(|e| anyhow!("Failed to compact tile store: {}", e))?;

    println!("File size: {} -> {} bytes", before, db.file_size());

    Ok(())
}
