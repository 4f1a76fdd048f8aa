use std::collections::HashMap;
use std::path::PathBuf;
use std::{env, process};

use mirror_core::config::{Config, PipelineSettings};
use mirror_core::view_tree::ViewTree;
use mirror_core::RecordStore;
use mirror_text::{ErrorPayload, IndexBuilder, QueryEngine, SearchIndex};
use mirror_views::{render_view_tree, LookupMaps, StoreViews};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage:
  mirror render [--dataset DIR] [--htdocs DIR]
  mirror index  [--from-store] [--rebuild] [--progress] [--dataset DIR] [--htdocs DIR] [--index DIR]
  mirror search [--index DIR] <query-string | key=value ...>";

struct Args {
    flags: Vec<String>,
    values: HashMap<String, String>,
    positional: Vec<String>,
}

impl Args {
    fn parse(raw: &[String]) -> anyhow::Result<Self> {
        let mut args = Self { flags: Vec::new(), values: HashMap::new(), positional: Vec::new() };
        let mut i = 0;
        while i < raw.len() {
            match raw[i].as_str() {
                name @ ("--dataset" | "--htdocs" | "--index") => {
                    let value = raw.get(i + 1).ok_or_else(|| anyhow::anyhow!("{name} requires a directory"))?;
                    args.values.insert(name.to_string(), value.clone());
                    i += 1;
                }
                flag if flag.starts_with("--") => args.flags.push(flag.to_string()),
                other => args.positional.push(other.to_string()),
            }
            i += 1;
        }
        Ok(args)
    }

    fn has(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    fn dir(&self, name: &str, default: &std::path::Path) -> PathBuf {
        self.values.get(name).map_or_else(|| default.to_path_buf(), |v| mirror_core::config::expand_path(v))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let settings = config.settings()?;

    let raw: Vec<String> = env::args().skip(1).collect();
    let Some((command, rest)) = raw.split_first() else {
        eprintln!("{USAGE}");
        process::exit(2);
    };
    let args = Args::parse(rest)?;
    match command.as_str() {
        "render" => render(&settings, &args),
        "index" => index(&settings, &args),
        "search" => search(&settings, &args),
        _ => {
            eprintln!("{USAGE}");
            process::exit(2);
        }
    }
}

fn render(settings: &PipelineSettings, args: &Args) -> anyhow::Result<()> {
    let store = RecordStore::open(args.dir("--dataset", &settings.dataset_dir))?;
    let tree = ViewTree::new(args.dir("--htdocs", &settings.htdocs_dir));
    let maps = LookupMaps::build(&store)?;
    let report = render_view_tree(&store, &maps, &tree)?;
    println!(
        "Rendered {} views into {} ({} excluded, {} withdrawn, {} failed)",
        report.rendered,
        tree.root().display(),
        report.excluded,
        report.withdrawn,
        report.failed
    );
    Ok(())
}

fn index(settings: &PipelineSettings, args: &Args) -> anyhow::Result<()> {
    let index_dir = args.dir("--index", &settings.index_dir);
    let index = if args.has("--rebuild") { SearchIndex::create(&index_dir)? } else { SearchIndex::open_or_create(&index_dir)? };
    info!(index = %index_dir.display(), "index opened");

    let builder = IndexBuilder::from_settings(&index, settings).with_progress(args.has("--progress"));
    let report = if args.has("--from-store") {
        let store = RecordStore::open(args.dir("--dataset", &settings.dataset_dir))?;
        let maps = LookupMaps::build(&store)?;
        builder.build(&StoreViews::new(&store, &maps))?
    } else {
        builder.build(&ViewTree::new(args.dir("--htdocs", &settings.htdocs_dir)))?
    };
    println!(
        "Indexed {} views, withdrew {}, in {} batches; index now holds {} documents",
        report.indexed,
        report.withdrawn,
        report.batches,
        index.num_docs()
    );
    Ok(())
}

fn search(settings: &PipelineSettings, args: &Args) -> anyhow::Result<()> {
    let index = SearchIndex::open(&args.dir("--index", &settings.index_dir))?;
    let engine = QueryEngine::from_settings(&index, settings);

    let mut raw: HashMap<String, String> = HashMap::new();
    for arg in &args.positional {
        raw.extend(url::form_urlencoded::parse(arg.trim_start_matches('?').as_bytes()).into_owned());
    }

    match engine.search(&raw) {
        Ok(page) => println!("{}", serde_json::to_string_pretty(&page)?),
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&ErrorPayload::from(&e))?);
            process::exit(1);
        }
    }
    Ok(())
}
