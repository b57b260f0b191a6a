use crate::cli::commands::{ListArg, TemplateAction, TemplateDeleteArgs, TemplateFieldsArgs, TemplateRenameArgs};
use crate::cli::output::{DeletedJson, RenamedJson, format_template, template_to_json};
use crate::model::template::{FieldDef, FieldType};
use crate::ops::schema_store;

use super::{Ctx, lock_list};

/// Parse a field given on the command line: `NAME`, `NAME:number`,
/// `NAME:date`, `NAME:text` or `NAME:category:a,b,c`.
pub(crate) fn parse_field_spec(spec: &str) -> Result<FieldDef, String> {
    let mut parts = spec.splitn(3, ':');
    let name = parts.next().unwrap_or_default().trim();
    if name.is_empty() {
        return Err(format!("field '{}' has no name", spec));
    }
    let kind = parts.next().map(|k| k.trim().to_ascii_lowercase());
    let field_type = match kind.as_deref() {
        None | Some("text") => FieldType::Text,
        Some("number") => FieldType::Number,
        Some("date") => FieldType::Date,
        Some("category") => {
            let categories: Vec<String> = parts
                .next()
                .unwrap_or_default()
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            FieldType::Category(categories)
        }
        Some(other) => {
            return Err(format!(
                "unknown field type '{}' (expected: text, number, date, category)",
                other
            ));
        }
    };
    if !matches!(field_type, FieldType::Category(_)) && parts.next().is_some() {
        return Err(format!("only category fields take a value list: '{}'", spec));
    }
    Ok(FieldDef::new(name, field_type))
}

fn parse_fields(specs: &[String]) -> Result<Vec<FieldDef>, String> {
    specs.iter().map(|s| parse_field_spec(s)).collect()
}

pub fn cmd_template(ctx: &Ctx, action: TemplateAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TemplateAction::New(args) => cmd_template_new(ctx, args),
        TemplateAction::Show(args) => cmd_template_show(ctx, args),
        TemplateAction::Edit(args) => cmd_template_edit(ctx, args),
        TemplateAction::Rename(args) => cmd_template_rename(ctx, args),
        TemplateAction::Delete(args) => cmd_template_delete(ctx, args),
    }
}

fn cmd_template_new(ctx: &Ctx, args: TemplateFieldsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.open_store()?;
    let fields = parse_fields(&args.fields)?;
    let _lock = lock_list(&store, &args.name)?;

    let template = schema_store::create_template(&store.layout, &args.name, &fields)?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&template_to_json(&template))?);
    } else {
        println!("Created list '{}' with {} field(s)", template.name, template.fields.len());
    }
    Ok(())
}

fn cmd_template_show(ctx: &Ctx, args: ListArg) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.open_store()?;
    let template = schema_store::read_template(&store.layout, &args.list)?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&template_to_json(&template))?);
    } else {
        for line in format_template(&template) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_template_edit(ctx: &Ctx, args: TemplateFieldsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.open_store()?;
    let fields = parse_fields(&args.fields)?;
    let _lock = lock_list(&store, &args.name)?;

    let template = schema_store::update_template(&store.layout, &args.name, &fields)?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&template_to_json(&template))?);
    } else {
        println!("Updated template '{}'", template.name);
    }
    Ok(())
}

fn cmd_template_rename(ctx: &Ctx, args: TemplateRenameArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.open_store()?;
    // Fixed order so two renames cannot wait on each other
    let (first, second) = if args.old <= args.new {
        (&args.old, &args.new)
    } else {
        (&args.new, &args.old)
    };
    let _first = lock_list(&store, first)?;
    let _second = if first != second {
        Some(lock_list(&store, second)?)
    } else {
        None
    };

    let template = schema_store::rename_template(&store.layout, &args.old, &args.new)?;
    if ctx.json {
        let renamed = RenamedJson {
            from: args.old,
            template: template_to_json(&template),
        };
        println!("{}", serde_json::to_string_pretty(&renamed)?);
    } else {
        println!("Renamed '{}' to '{}'", args.old, template.name);
    }
    Ok(())
}

fn cmd_template_delete(ctx: &Ctx, args: TemplateDeleteArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.yes {
        return Err(format!(
            "deleting '{}' removes all of its records; pass --yes to confirm",
            args.name
        )
        .into());
    }
    let store = ctx.open_store()?;
    let _lock = lock_list(&store, &args.name)?;
    schema_store::delete_template(&store.layout, &args.name)?;
    if ctx.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&DeletedJson { deleted: args.name })?
        );
    } else {
        println!("Deleted list '{}'", args.name);
    }
    Ok(())
}
