use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lister", about = concat!("lister v", env!("CARGO_PKG_VERSION"), " - checklists as plain files"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different store directory
    #[arg(short = 'C', long = "store-dir", global = true)]
    pub store_dir: Option<String>,

    /// More diagnostics on stderr (repeatable)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors on stderr
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a store in the current directory
    Init(InitArgs),
    /// List all lists
    Lists,
    /// Manage templates
    Template(TemplateCmd),
    /// Add a record to a list
    Add(AddArgs),
    /// Show a record
    Show(RecordArg),
    /// Change field values of a record
    Edit(EditArgs),
    /// Delete a record
    Rm(RecordArg),
    /// Toggle a record's checked flag
    Check(RecordArg),
    /// List the records of a list, most recent first, unchecked on top
    Ls(LsArgs),
    /// Show a list's records as a table
    Table(TableArgs),
    /// Export a list's inbox to exports/<list>.csv
    Export(ListArg),
    /// Move a record from the inbox to the archive
    Archive(RecordArg),
    /// Move a record from the archive back to the inbox
    Restore(RecordArg),
    /// Move a record to the other partition
    Mv(RecordArg),
    /// Archive every checked record (or restore every unchecked one with --archive)
    Sweep(SweepArgs),
    /// Read or change lister.toml
    Config(ConfigCmd),
}

#[derive(Args)]
pub struct InitArgs {
    /// Store name (default: directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// Rewrite lister.toml even if it exists
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TemplateCmd {
    #[command(subcommand)]
    pub action: TemplateAction,
}

#[derive(Subcommand)]
pub enum TemplateAction {
    /// Create a template and its list
    New(TemplateFieldsArgs),
    /// Show a template's fields
    Show(ListArg),
    /// Replace a template's fields (existing records are left as they are)
    Edit(TemplateFieldsArgs),
    /// Rename a template, its list and its archive
    Rename(TemplateRenameArgs),
    /// Delete a template with all of its records
    Delete(TemplateDeleteArgs),
}

#[derive(Args)]
pub struct TemplateFieldsArgs {
    /// Template (list) name
    pub name: String,
    /// Fields in order: NAME, NAME:number, NAME:date or NAME:category:a,b,c
    #[arg(required = true)]
    pub fields: Vec<String>,
}

#[derive(Args)]
pub struct TemplateRenameArgs {
    pub old: String,
    pub new: String,
}

#[derive(Args)]
pub struct TemplateDeleteArgs {
    pub name: String,
    /// Required: deletion removes every record of the list
    #[arg(long)]
    pub yes: bool,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListArg {
    /// List name
    pub list: String,
}

#[derive(Args)]
pub struct RecordArg {
    /// Record path or file name
    pub record: String,
}

#[derive(Args)]
pub struct AddArgs {
    /// List name
    pub list: String,
    /// Field values as FIELD=VALUE; a bare value fills the first field
    #[arg(required = true)]
    pub values: Vec<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Record path or file name
    pub record: String,
    /// New values as FIELD=VALUE
    #[arg(required = true)]
    pub values: Vec<String>,
}

#[derive(Args)]
pub struct LsArgs {
    /// List name
    pub list: String,
    /// Show the archive instead of the inbox
    #[arg(long)]
    pub archive: bool,
    /// Only records whose title contains this text (case-insensitive)
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Args)]
pub struct TableArgs {
    /// List name
    pub list: String,
    /// Show the archive instead of the inbox
    #[arg(long)]
    pub archive: bool,
    /// Sort rows by this column
    #[arg(long)]
    pub sort: Option<String>,
    /// Sort descending
    #[arg(long, requires = "sort")]
    pub desc: bool,
}

#[derive(Args)]
pub struct SweepArgs {
    /// List name
    pub list: String,
    /// Restore unchecked archived records instead
    #[arg(long)]
    pub archive: bool,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print a value, e.g. `loader.workers`
    Get(ConfigGetArgs),
    /// Set a value, keeping the rest of the file as written
    Set(ConfigSetArgs),
}

#[derive(Args)]
pub struct ConfigGetArgs {
    pub key: String,
}

#[derive(Args)]
pub struct ConfigSetArgs {
    pub key: String,
    pub value: String,
}
