// src/services/export_service.rs

use chrono::NaiveDate;
use genpdf::{elements, style, Element};
use rust_decimal::Decimal;

use crate::{
    common::{
        error::AppError,
        numeric::{format_money, format_quantity, round_money},
    },
    editor::session::QuoteSnapshot,
};

/// `Orcamento_<evento>_<convidados>_<dd-mm-aaaa>.<ext>`
pub fn file_name(event_label: &str, guest_count: i32, date: NaiveDate, extension: &str) -> String {
    let label: String = event_label
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    format!("Orcamento_{}_{}_{}.{}", label, guest_count, date.format("%d-%m-%Y"), extension)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_money(value: Decimal) -> String {
    format!("{:.2}", round_money(value))
}

fn csv_row(out: &mut String, fields: [&str; 7]) {
    let line = fields.iter().map(|f| csv_field(f)).collect::<Vec<_>>().join(",");
    out.push_str(&line);
    out.push_str("\r\n");
}

/// Uma linha por item (seção/tipo), seguida das linhas de totais.
pub fn render_csv(snapshot: &QuoteSnapshot) -> String {
    let quote = &snapshot.quote;
    let totals = &snapshot.totals;
    let mut out = String::new();

    csv_row(
        &mut out,
        ["Seção", "Tipo", "Item", "Quantidade", "Unidade", "Custo Unitário", "Custo Total"],
    );

    for section in quote.menu_sections.iter() {
        for item in section.ingredients.iter() {
            csv_row(
                &mut out,
                [
                    &section.name,
                    "Ingrediente",
                    &item.name,
                    &format_quantity(item.quantity),
                    &item.unit,
                    &csv_money(item.unit_cost),
                    &csv_money(item.line_cost()),
                ],
            );
        }
    }

    for line in quote.labor_lines.iter() {
        csv_row(
            &mut out,
            [
                "",
                "Mão de Obra",
                &line.role,
                &format_quantity(line.count),
                "profissional",
                &csv_money(line.cost_per_unit),
                &csv_money(line.line_cost()),
            ],
        );
    }

    for cost in quote.other_costs.iter() {
        csv_row(&mut out, ["", "Outro Custo", &cost.name, "", "", "", &csv_money(cost.amount)]);
    }

    let tax_label = format!("Impostos ({}%)", format_quantity(totals.tax_rate));
    let margin_label = format!("Preço Sugerido ({}% de margem)", format_quantity(snapshot.pricing.margin_percent));
    let summary = [
        ("Custo de Ingredientes", totals.ingredients_cost),
        ("Mão de Obra", totals.labor_cost),
        ("Custo de Produção", totals.production_cost),
        ("Outros Custos", totals.other_costs_total),
        (tax_label.as_str(), totals.tax_amount),
        ("Custo Total", totals.total_cost),
        (margin_label.as_str(), snapshot.pricing.suggested_price),
        ("Lucro Bruto", snapshot.pricing.gross_profit),
    ];
    for (label, value) in summary {
        csv_row(&mut out, ["", "Total", label, "", "", "", &csv_money(value)]);
    }

    out
}

fn table_error(e: genpdf::error::Error) -> AppError {
    AppError::InternalServerError(anyhow::Error::msg(e.to_string()))
}

#[derive(Clone)]
pub struct ExportService {
    fonts_dir: String,
}

impl ExportService {
    pub fn new(fonts_dir: impl Into<String>) -> Self {
        Self { fonts_dir: fonts_dir.into() }
    }

    pub fn render_pdf(&self, snapshot: &QuoteSnapshot) -> Result<Vec<u8>, AppError> {
        let quote = &snapshot.quote;
        let totals = &snapshot.totals;

        // Carrega a fonte da pasta configurada
        let font_family = genpdf::fonts::from_files(&self.fonts_dir, "Roboto", None)
            .map_err(|_| AppError::FontNotFound(format!("Fonte não encontrada na pasta {}", self.fonts_dir)))?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(format!("Orçamento {}", quote.event_label));
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        let bold = style::Style::new().bold();

        // --- CABEÇALHO ---
        doc.push(elements::Paragraph::new(format!("ORÇAMENTO: {}", quote.event_label)).styled(bold.with_font_size(18)));
        doc.push(elements::Paragraph::new(format!("Convidados: {}", quote.guest_count)));
        if let Some(date) = quote.event_date {
            doc.push(elements::Paragraph::new(format!("Data do evento: {}", date.format("%d/%m/%Y"))));
        }
        doc.push(elements::Break::new(1.5));

        // --- CARDÁPIO ---
        for section in quote.menu_sections.iter() {
            doc.push(elements::Paragraph::new(section.name.clone()).styled(bold.with_font_size(14)));

            // Pesos das colunas: Ingrediente (4), Qtd (2), Unitário (2), Total (2)
            let mut table = elements::TableLayout::new(vec![4, 2, 2, 2]);
            table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));
            table
                .row()
                .element(elements::Paragraph::new("Ingrediente").styled(bold))
                .element(elements::Paragraph::new("Qtd").styled(bold))
                .element(elements::Paragraph::new("Unitário").styled(bold))
                .element(elements::Paragraph::new("Total").styled(bold))
                .push()
                .map_err(table_error)?;

            for item in section.ingredients.iter() {
                table
                    .row()
                    .element(elements::Paragraph::new(item.name.clone()))
                    .element(elements::Paragraph::new(format!("{} {}", format_quantity(item.quantity), item.unit)))
                    .element(elements::Paragraph::new(format_money(item.unit_cost)))
                    .element(elements::Paragraph::new(format_money(item.line_cost())))
                    .push()
                    .map_err(table_error)?;
            }

            doc.push(table);
            doc.push(elements::Break::new(1));
        }

        // --- MÃO DE OBRA ---
        if !quote.labor_lines.is_empty() {
            doc.push(elements::Paragraph::new("Mão de Obra").styled(bold.with_font_size(14)));
            let mut table = elements::TableLayout::new(vec![4, 2, 2, 2]);
            table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));
            for line in quote.labor_lines.iter() {
                table
                    .row()
                    .element(elements::Paragraph::new(line.role.clone()))
                    .element(elements::Paragraph::new(format_quantity(line.count)))
                    .element(elements::Paragraph::new(format_money(line.cost_per_unit)))
                    .element(elements::Paragraph::new(format_money(line.line_cost())))
                    .push()
                    .map_err(table_error)?;
            }
            doc.push(table);
            doc.push(elements::Break::new(1));
        }

        // --- OUTROS CUSTOS ---
        if !quote.other_costs.is_empty() {
            doc.push(elements::Paragraph::new("Outros Custos").styled(bold.with_font_size(14)));
            for cost in quote.other_costs.iter() {
                doc.push(elements::Paragraph::new(format!("{}: {}", cost.name, format_money(cost.amount))));
            }
            doc.push(elements::Break::new(1));
        }

        // --- PREMISSAS ---
        if !quote.consumption_premises.is_empty() {
            doc.push(elements::Paragraph::new("Premissas de Consumo").styled(bold.with_font_size(12)));
            for premise in quote.consumption_premises.iter() {
                doc.push(elements::Paragraph::new(format!("• {premise}")).styled(style::Style::new().with_font_size(9)));
            }
            doc.push(elements::Break::new(1));
        }

        // --- TOTAIS ---
        let lines = [
            ("Ingredientes", totals.ingredients_cost),
            ("Mão de Obra", totals.labor_cost),
            ("Custo de Produção", totals.production_cost),
            ("Outros Custos", totals.other_costs_total),
            ("Impostos", totals.tax_amount),
            ("CUSTO TOTAL", totals.total_cost),
        ];
        for (label, value) in lines {
            let mut paragraph = elements::Paragraph::new(format!("{label}: {}", format_money(value)));
            paragraph.set_alignment(genpdf::Alignment::Right);
            doc.push(paragraph);
        }

        let mut price = elements::Paragraph::new(format!(
            "PREÇO SUGERIDO ({}%): {}",
            format_quantity(snapshot.pricing.margin_percent),
            format_money(snapshot.pricing.suggested_price)
        ));
        price.set_alignment(genpdf::Alignment::Right);
        doc.push(price.styled(bold.with_font_size(12)));

        // Renderiza para buffer em memória
        let mut buffer = Vec::new();
        doc.render(&mut buffer)
            .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

        Ok(buffer)
    }
}
