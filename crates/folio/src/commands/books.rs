//! Book commands - one-shot catalog operations.

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::Args;
use console::{Style, style};
use folio_catalog::{Book, BookDraft, BookId, BookUpdate};

use super::Context;

/// Arguments for the get command.
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Book ID
    pub id: String,
}

/// Arguments for the add command.
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Book title
    #[arg(long)]
    pub title: String,

    /// Author name
    #[arg(long)]
    pub author: String,

    /// ISBN-10 or ISBN-13 (hyphens allowed)
    #[arg(long)]
    pub isbn: String,

    /// Publication date (YYYY-MM-DD)
    #[arg(long)]
    pub published: NaiveDate,
}

/// Arguments for the update command.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Book ID
    pub id: String,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New author
    #[arg(long)]
    pub author: Option<String>,

    /// New ISBN
    #[arg(long)]
    pub isbn: Option<String>,

    /// New publication date (YYYY-MM-DD)
    #[arg(long)]
    pub published: Option<NaiveDate>,
}

/// Arguments for the delete command.
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Book ID
    pub id: String,
}

pub async fn list(ctx: &Context) -> Result<()> {
    let catalog = ctx.open_catalog()?;
    let books = catalog.list_all().await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(books.as_slice())?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!("{}", style("Books").bold());
    println!("{}", dim.apply_to("─".repeat(50)));
    if books.is_empty() {
        println!("{}", dim.apply_to("No books found"));
    } else {
        for book in books.iter() {
            print_line(book);
        }
    }
    Ok(())
}

pub async fn get(args: GetArgs, ctx: &Context) -> Result<()> {
    let catalog = ctx.open_catalog()?;
    let book = catalog.get_by_id(&BookId::new(args.id)).await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&book)?);
    } else {
        print_details(&book);
    }
    Ok(())
}

pub async fn add(args: AddArgs, ctx: &Context) -> Result<()> {
    let catalog = ctx.open_catalog()?;
    let draft = BookDraft::new(args.title, args.author, args.isbn, args.published);
    let book = catalog.create(draft).await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&book)?);
    } else {
        let green = Style::new().green();
        println!(
            "{} Book created: {}",
            green.apply_to("✓"),
            Style::new().dim().apply_to(&book.id)
        );
    }
    Ok(())
}

pub async fn update(args: UpdateArgs, ctx: &Context) -> Result<()> {
    let mut update = BookUpdate::new();
    update.title = args.title;
    update.author = args.author;
    update.isbn = args.isbn;
    update.published_date = args.published;
    if update.is_empty() {
        bail!("nothing to update: pass at least one of --title, --author, --isbn, --published");
    }

    let catalog = ctx.open_catalog()?;
    let book = catalog.update(&BookId::new(args.id), update).await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&book)?);
    } else {
        let green = Style::new().green();
        println!("{} Book updated", green.apply_to("✓"));
        print_details(&book);
    }
    Ok(())
}

pub async fn delete(args: DeleteArgs, ctx: &Context) -> Result<()> {
    let catalog = ctx.open_catalog()?;
    let id = BookId::new(args.id);
    let deleted = catalog.delete(&id).await?;

    if ctx.json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "id": id, "deleted": deleted }))?
        );
    } else if deleted {
        let green = Style::new().green();
        println!("{} Book deleted: {}", green.apply_to("✓"), id);
    } else {
        let dim = Style::new().dim();
        println!("{}", dim.apply_to(format!("No book with id {id}, nothing deleted")));
    }
    Ok(())
}

fn print_line(book: &Book) {
    let dim = Style::new().dim();
    println!(
        "{} {} {} {}",
        dim.apply_to(format!("[{}]", book.id)),
        book.title,
        dim.apply_to("by"),
        book.author
    );
}

fn print_details(book: &Book) {
    let dim = Style::new().dim();
    println!("{}", style(&book.title).bold());
    println!("{}", dim.apply_to("─".repeat(50)));
    println!("  {:<10} {}", dim.apply_to("ID"), book.id);
    println!("  {:<10} {}", dim.apply_to("Author"), book.author);
    println!("  {:<10} {}", dim.apply_to("ISBN"), book.isbn);
    println!("  {:<10} {}", dim.apply_to("Published"), book.published_date);
}
