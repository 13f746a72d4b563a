use chrono::NaiveDate;

use crate::models::{CanonicalRecord, Source};

/// Column layouts consumed downstream. Order and header spelling are a
/// contract; do not touch them without coordinating with the consumers.
pub const PGC_HEADER: &str =
    "Pag;DFD;Requisitante;Descrição;Valor;Situação;Conclusão;Editor;Responsáveis;PTA;Justificativa";
pub const PNCP_HEADER: &str =
    "Contratação;Descrição;Categoria;Valor;Início;Fim;Status;PGC;DFD;Status;Tipo";

/// Render the canonical records of one source as semicolon-separated rows
/// under that source's fixed header.
pub fn to_csv(source: Source, records: &[CanonicalRecord]) -> String {
    let mut out = String::new();
    out.push_str(header(source));
    out.push('\n');
    for canonical in records {
        if canonical.source != source {
            continue;
        }
        out.push_str(&row(source, canonical));
        out.push('\n');
    }
    out
}

pub fn header(source: Source) -> &'static str {
    match source {
        Source::Pgc => PGC_HEADER,
        Source::Pncp => PNCP_HEADER,
    }
}

fn row(source: Source, canonical: &CanonicalRecord) -> String {
    let r = &canonical.record;
    let cells: Vec<String> = match source {
        // Pag and the trailing workflow columns are filled by the
        // downstream consumer, not by collection.
        Source::Pgc => vec![
            String::new(),
            r.document_ref.clone(),
            r.category.clone(),
            r.description.clone(),
            r.value.to_string(),
            r.status.clone(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ],
        // Columns J/K repeat status and type; the consumer's sheet
        // references both positions.
        Source::Pncp => vec![
            r.contract_id.clone(),
            r.description.clone(),
            r.category.clone(),
            r.value.to_string(),
            date(r.start_date),
            date(r.end_date),
            r.status.clone(),
            String::new(),
            r.document_ref.clone(),
            r.status.clone(),
            r.status_type.clone(),
        ],
    };
    cells
        .iter()
        .map(|c| quote(c))
        .collect::<Vec<_>>()
        .join(";")
}

fn date(value: Option<NaiveDate>) -> String {
    value
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_default()
}

fn quote(cell: &str) -> String {
    if cell.contains(';') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
