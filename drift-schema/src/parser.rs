//! Line-classified parser for `CREATE TABLE` statements as emitted by the
//! target engine (`SHOW CREATE TABLE`) or written inline in a single line.
//!
//! Every parsed entity gets a freshly generated [`Metadata`] record with
//! `exists = true`; callers that know the live database reconcile those ids
//! against the metadata store afterwards.

use crate::error::{ParseError, Result};
use crate::metadata::{Metadata, PropertyKind};
use crate::model::{Column, Index, IndexColumn, Table};
use crate::types::ColumnType;

pub fn parse_create_table(ddl: &str) -> Result<Table> {
    let lines = logical_lines(ddl);

    if lines.len() < 2 {
        return Err(ParseError::MissingTableName(ddl.trim().to_owned()));
    }

    let name = table_name(&lines[0])?;
    let footer = &lines[lines.len() - 1];

    let mut table = Table::new(name);
    table.meta = Metadata::generate(PropertyKind::Table, table.name.clone());
    table.meta.exists = true;

    if let Some(engine) = extract_param(footer, "ENGINE=") {
        table.engine = engine;
    }

    if let Some(charset) = extract_param(footer, "CHARSET=") {
        table.charset = charset;
    }

    if let Some(auto_inc) = extract_param(footer, "AUTO_INCREMENT=") {
        table.auto_inc = auto_inc.parse().ok();
    }

    for line in &lines[1..lines.len() - 1] {
        if line.starts_with("PRIMARY KEY") {
            let mut primary = parse_primary(line)?;
            attach(&mut primary.meta, &table);
            table.primary = Some(primary);
        } else if line.starts_with("KEY") || line.starts_with("UNIQUE KEY") {
            let mut index = parse_secondary(line)?;
            attach(&mut index.meta, &table);
            table.secondary.push(index);
        } else {
            let mut column = parse_column(line)?;
            attach(&mut column.meta, &table);
            table.columns.push(column);
        }
    }

    Ok(table)
}

fn attach(meta: &mut Metadata, table: &Table) {
    *meta = Metadata::generate(meta.kind, meta.name.clone())
        .with_parent(table.meta.property_id.clone());
    meta.exists = true;
}

/// Split one statement into logical lines with trailing commas trimmed.
/// Multi-line input (the `SHOW CREATE TABLE` shape) splits on newlines;
/// single-line input splits the body on top-level commas.
fn logical_lines(ddl: &str) -> Vec<String> {
    let trimmed = ddl.trim();

    if trimmed.lines().count() > 1 {
        return trimmed
            .lines()
            .map(|l| l.trim().trim_end_matches(',').trim().to_owned())
            .filter(|l| !l.is_empty())
            .collect();
    }

    let Some(open) = trimmed.find('(') else {
        return vec![trimmed.to_owned()];
    };

    let mut depth = 0usize;
    let mut close = trimmed.len();

    for (i, ch) in trimmed[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;

                if depth == 0 {
                    close = open + i;
                    break;
                }
            }
            _ => {}
        }
    }

    let mut lines = vec![format!("{} (", trimmed[..open].trim())];
    let body = &trimmed[open + 1..close];
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, ch) in body.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                lines.push(body[start..i].trim().to_owned());
                start = i + 1;
            }
            _ => {}
        }
    }

    let tail = body[start..].trim();

    if !tail.is_empty() {
        lines.push(tail.to_owned());
    }

    lines.push(format!(") {}", trimmed[close + 1..].trim()).trim().to_owned());
    lines.retain(|l| !l.is_empty());

    lines
}

fn table_name(header: &str) -> Result<String> {
    header
        .split_whitespace()
        .nth(2)
        .map(|t| unquote(t.trim_end_matches('(')).to_owned())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ParseError::MissingTableName(header.to_owned()))
}

/// `key=value` extraction, value running up to the next whitespace.
fn extract_param(line: &str, key: &str) -> Option<String> {
    let start = line.find(key)? + key.len();
    let rest = &line[start..];
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let value = rest[..end].trim_end_matches(';');

    (!value.is_empty()).then(|| value.to_owned())
}

fn unquote(token: &str) -> &str {
    token.trim_matches('`')
}

fn parse_column(line: &str) -> Result<Column> {
    let mut tokens = line.split_whitespace();

    let name = tokens
        .next()
        .map(unquote)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ParseError::MissingType(line.to_owned()))?
        .to_owned();

    let type_token = tokens
        .next()
        .ok_or_else(|| ParseError::MissingType(line.to_owned()))?;

    let (type_name, size) = match type_token.split_once('(') {
        Some((name, rest)) => (name, parse_size(rest.trim_end_matches(')'))?),
        None => (type_token, Vec::new()),
    };

    let ctype: ColumnType = type_name.parse()?;

    if size.len() > ctype.max_size_args() {
        return Err(ParseError::MalformedSize(type_token.to_owned()));
    }

    let mut column = Column::new(name, ctype).size(size);
    column.nullable = !line.contains("NOT NULL");
    column.auto_inc = line.contains("AUTO_INCREMENT");

    let tokens: Vec<&str> = line.split_whitespace().collect();

    if let Some(pos) = tokens.iter().position(|t| *t == "DEFAULT") {
        let value = tokens
            .get(pos + 1)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ParseError::MissingDefault(line.to_owned()))?;

        column.default = Some((*value).trim_end_matches(',').to_owned());
    }

    Ok(column)
}

fn parse_size(dims: &str) -> Result<Vec<u32>> {
    dims.split(',')
        .map(|d| {
            d.trim()
                .parse::<u32>()
                .map_err(|_| ParseError::MalformedSize(dims.to_owned()))
        })
        .collect()
}

fn parse_primary(line: &str) -> Result<Index> {
    let (open, close) = match (line.find('('), line.rfind(')')) {
        (Some(open), Some(close)) if open < close => (open, close),
        _ => return Err(ParseError::MalformedPrimaryKey(line.to_owned())),
    };

    let mut index = Index::primary();
    index.columns = parse_index_columns(&line[open + 1..close], index.name.clone())?;

    Ok(index)
}

fn parse_secondary(line: &str) -> Result<Index> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    let key_pos = tokens
        .iter()
        .position(|t| *t == "KEY")
        .ok_or_else(|| ParseError::EmptyIndexName(line.to_owned()))?;

    let name = tokens
        .get(key_pos + 1)
        .map(|t| unquote(t))
        .filter(|n| !n.is_empty() && !n.starts_with('('))
        .ok_or_else(|| ParseError::EmptyIndexName(line.to_owned()))?
        .to_owned();

    let (open, close) = match (line.find('('), line.rfind(')')) {
        (Some(open), Some(close)) if open < close => (open, close),
        _ => return Err(ParseError::EmptyIndexColumns(name)),
    };

    let mut index = Index::new(name.clone());
    index.is_unique = line.starts_with("UNIQUE");
    index.columns = parse_index_columns(&line[open + 1..close], name)?;

    Ok(index)
}

fn parse_index_columns(inner: &str, index_name: String) -> Result<Vec<IndexColumn>> {
    let columns: Vec<IndexColumn> = inner
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| {
            let column = unquote(c);

            match column.split_once('(') {
                Some((name, rest)) => {
                    let prefix = rest
                        .trim_end_matches(')')
                        .parse::<u32>()
                        .map_err(|_| ParseError::MalformedSize(column.to_owned()))?;

                    Ok(IndexColumn::with_prefix(unquote(name), prefix))
                }
                None => Ok(IndexColumn::new(column)),
            }
        })
        .collect::<Result<_>>()?;

    if columns.is_empty() {
        return Err(ParseError::EmptyIndexColumns(index_name));
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE_LINE: &str = "CREATE TABLE test (id int(11) NOT NULL, name varchar(64) NOT NULL, \
                               PRIMARY KEY (id), KEY idx_id_name (id,name)) \
                               ENGINE=InnoDB DEFAULT CHARSET=latin1";

    #[test]
    fn single_line_round_trip() {
        let table = parse_create_table(SINGLE_LINE).unwrap();

        assert_eq!(table.name, "test");
        assert_eq!(table.engine, "InnoDB");
        assert_eq!(table.charset, "latin1");
        assert_eq!(table.columns.len(), 2);

        let primary = table.primary.as_ref().unwrap();
        assert!(primary.is_primary);
        assert_eq!(primary.name, "PrimaryKey");
        assert_eq!(primary.columns.len(), 1);
        assert_eq!(primary.columns[0].name, "id");

        assert_eq!(table.secondary.len(), 1);
        let idx = &table.secondary[0];
        assert_eq!(idx.name, "idx_id_name");
        assert_eq!(idx.columns[0].name, "id");
        assert_eq!(idx.columns[1].name, "name");

        // re-emission is byte-equal modulo whitespace
        let strip = |s: &str| s.replace(' ', "");
        assert_eq!(strip(&table.to_ddl()), strip(SINGLE_LINE));
    }

    #[test]
    fn show_create_table_shape() {
        let ddl = "CREATE TABLE `users` (\n\
                   \x20 `id` bigint(20) NOT NULL AUTO_INCREMENT,\n\
                   \x20 `email` varchar(128) NOT NULL,\n\
                   \x20 `bio` text,\n\
                   \x20 `state` varchar(16) NOT NULL DEFAULT 'new',\n\
                   \x20 PRIMARY KEY (`id`),\n\
                   \x20 UNIQUE KEY `idx_email` (`email`(32))\n\
                   ) ENGINE=InnoDB AUTO_INCREMENT=42 DEFAULT CHARSET=utf8;";

        let table = parse_create_table(ddl).unwrap();

        assert_eq!(table.name, "users");
        assert_eq!(table.auto_inc, Some(42));
        assert_eq!(table.charset, "utf8");

        let id = &table.columns[0];
        assert!(!id.nullable);
        assert!(id.auto_inc);
        assert_eq!(id.size, vec![20]);

        let bio = &table.columns[2];
        assert!(bio.nullable);
        assert!(bio.size.is_empty());

        let state = &table.columns[3];
        assert_eq!(state.default.as_deref(), Some("'new'"));

        let idx = &table.secondary[0];
        assert!(idx.is_unique);
        assert_eq!(idx.columns[0].prefix, Some(32));
    }

    #[test]
    fn metadata_is_generated_and_linked() {
        let table = parse_create_table(SINGLE_LINE).unwrap();

        assert!(!table.meta.property_id.is_empty());
        assert!(table.meta.exists);

        for column in &table.columns {
            assert!(!column.meta.property_id.is_empty());
            assert_eq!(column.meta.parent_id, table.meta.property_id);
        }

        let primary = table.primary.as_ref().unwrap();
        assert_eq!(primary.meta.kind, PropertyKind::PrimaryKey);
        assert_eq!(primary.meta.parent_id, table.meta.property_id);
    }

    #[test]
    fn missing_type_fails() {
        let err = parse_create_table("CREATE TABLE t (id) ENGINE=InnoDB").unwrap_err();
        assert!(matches!(err, ParseError::MissingType(_)));
    }

    #[test]
    fn malformed_size_fails() {
        let err = parse_create_table("CREATE TABLE t (id int(sk)) ENGINE=InnoDB").unwrap_err();
        assert!(matches!(err, ParseError::MalformedSize(_)));
    }

    #[test]
    fn unknown_type_fails() {
        let err = parse_create_table("CREATE TABLE t (id foobar(1)) ENGINE=InnoDB").unwrap_err();
        assert!(matches!(err, ParseError::UnknownType(_)));
    }

    #[test]
    fn missing_default_fails() {
        let ddl = "CREATE TABLE `t` (\n`id` int(11) DEFAULT\n) ENGINE=InnoDB";
        let err = parse_create_table(ddl).unwrap_err();
        assert!(matches!(err, ParseError::MissingDefault(_)));
    }

    #[test]
    fn primary_key_without_parens_fails() {
        let ddl = "CREATE TABLE `t` (\n`id` int(11) NOT NULL,\nPRIMARY KEY\n) ENGINE=InnoDB";
        let err = parse_create_table(ddl).unwrap_err();
        assert!(matches!(err, ParseError::MalformedPrimaryKey(_)));
    }

    #[test]
    fn empty_index_column_list_fails() {
        let ddl = "CREATE TABLE `t` (\n`id` int(11) NOT NULL,\nKEY `idx` ()\n) ENGINE=InnoDB";
        let err = parse_create_table(ddl).unwrap_err();
        assert!(matches!(err, ParseError::EmptyIndexColumns(_)));
    }

    #[test]
    fn empty_index_name_fails() {
        let ddl = "CREATE TABLE `t` (\n`id` int(11) NOT NULL,\nKEY (`id`)\n) ENGINE=InnoDB";
        let err = parse_create_table(ddl).unwrap_err();
        assert!(matches!(err, ParseError::EmptyIndexName(_)));
    }

    #[test]
    fn default_null_is_textual() {
        let ddl = "CREATE TABLE `t` (\n`age` int(11) DEFAULT NULL\n) ENGINE=InnoDB";
        let table = parse_create_table(ddl).unwrap();

        assert_eq!(table.columns[0].default.as_deref(), Some("NULL"));
        assert!(table.columns[0].nullable);
    }
}
