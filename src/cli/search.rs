use std::time::Instant;

use clap::builder::styling::AnsiColor;
use humantime::format_duration;
use log::info;

use crate::{
    error::Result,
    format::{format_path, format_size, format_time},
    search::{MatchKind, SearchEngine, SearchQuery},
};

use super::{
    args::{IndexArgs, IndexCommand, QuickSearchArgs, SearchArgs},
    context::{progress_logger, Context},
    print_json, print_stat,
};

pub async fn search(ctx: &Context, args: SearchArgs) -> Result<()> {
    let settings = &ctx.settings().search;
    let mut engine = ctx.search_engine().await?;
    if args.history || args.clear_history {
        return history(ctx, &mut engine, args.clear_history).await;
    }

    let root = ctx.resolve(args.path.as_deref()).await?;
    let (pattern, content) = name_and_content(args.pattern, args.content, settings.search_in_content);
    let query = SearchQuery {
        pattern,
        content,
        file_type: args.file_type,
        size_min: args.min_size,
        size_max: args.max_size,
        modified_from: args.after,
        modified_to: args.before,
        case_sensitive: args.case_sensitive || settings.case_sensitive_search,
        regex: args.regex || settings.use_regex,
        max_results: args.max_results.unwrap_or(settings.max_search_results),
        use_index: !args.no_index,
        excludes: settings.exclude_patterns.clone(),
        recursive: !args.no_recursive && settings.search_subdirectories,
    };

    let start = Instant::now();
    let results = engine
        .search(&root, query, Some(progress_logger("searched")))
        .await?;
    ctx.save_search_engine(&engine).await?;
    if ctx.json {
        return print_json(&results);
    }

    let line_style = AnsiColor::BrightBlack.on_default();
    for result in &results {
        match (result.kind, &result.line, result.line_number) {
            (MatchKind::Content, Some(line), Some(number)) => info!(
                "{}:{number}: {line_style}{}{line_style:#}",
                format_path(&result.path),
                line.trim()
            ),
            _ => info!("{}", format_path(&result.path)),
        }
    }

    if ctx.stats {
        let total_size = results.iter().map(|result| result.size).sum::<u64>();
        print_stat("results", results.len());
        print_stat("total size", format_size(total_size));
        print_stat("elapsed time", format_duration(start.elapsed()));
    }

    Ok(())
}

/// With content search on and no explicit text, the pattern is also looked
/// for inside files; names still match it through the content fallback.
fn name_and_content(
    pattern: String,
    content: Option<String>,
    search_in_content: bool,
) -> (String, Option<String>) {
    match content {
        None if search_in_content && pattern != "*" => ("*".to_owned(), Some(pattern)),
        content => (pattern, content),
    }
}

async fn history(ctx: &Context, engine: &mut SearchEngine, clear: bool) -> Result<()> {
    if clear {
        engine.clear_history();
        ctx.save_search_engine(engine).await?;
        info!("cleared the search history");
        return Ok(());
    }

    let entries = engine.history().collect::<Vec<_>>();
    if ctx.json {
        return print_json(&entries);
    }

    let style = AnsiColor::BrightBlack.on_default();
    for entry in entries {
        let content = entry
            .content
            .as_ref()
            .map(|content| format!(" containing {content:?}"))
            .unwrap_or_default();
        info!(
            "{style}{}{style:#} {}{content} in {}",
            format_time(&entry.timestamp),
            entry.pattern,
            format_path(&entry.root)
        );
    }

    Ok(())
}

pub async fn quick_search(ctx: &Context, args: QuickSearchArgs) -> Result<()> {
    let root = ctx.resolve(args.path.as_deref()).await?;
    let engine = ctx.search_engine().await?;
    let paths = engine
        .quick_search(&root, &args.query, args.max_results)
        .await?;
    if ctx.json {
        return print_json(&paths);
    }

    for path in &paths {
        info!("{}", format_path(path));
    }

    Ok(())
}

pub async fn index(ctx: &Context, args: IndexArgs) -> Result<()> {
    let engine = ctx.search_engine().await?;

    match args.command {
        IndexCommand::Update(args) => {
            let root = ctx.resolve(args.path.as_deref()).await?;
            let start = Instant::now();
            let indexed = engine
                .update_index(&root, Some(progress_logger("indexed")))
                .await?;
            engine.save(&ctx.index_file()).await?;

            info!("indexed {indexed} files below {}", format_path(&root));
            if ctx.stats {
                print_stat("elapsed time", format_duration(start.elapsed()));
            }
        }
        IndexCommand::Clear => {
            engine.clear_index().await;
            engine.save(&ctx.index_file()).await?;
            info!("cleared the search index");
        }
        IndexCommand::Stats => {
            let stats = engine.stats().await;
            if ctx.json {
                return print_json(&stats);
            }

            print_stat("indexed files", stats.indexed_files);
            print_stat("indexed words", stats.indexed_words);
            print_stat("indexing enabled", stats.indexing_enabled);
            print_stat("content size limit", format_size(stats.max_content_size));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::name_and_content;

    #[test]
    fn content_search_setting_reuses_the_pattern() {
        assert_eq!(
            name_and_content("todo".to_owned(), None, true),
            ("*".to_owned(), Some("todo".to_owned()))
        );
        assert_eq!(
            name_and_content("todo".to_owned(), Some("fixme".to_owned()), true),
            ("todo".to_owned(), Some("fixme".to_owned()))
        );
        assert_eq!(name_and_content("*".to_owned(), None, true), ("*".to_owned(), None));
        assert_eq!(
            name_and_content("todo".to_owned(), None, false),
            ("todo".to_owned(), None)
        );
    }
}
