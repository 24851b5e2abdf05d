//! Printable proposal document
//!
//! [`ProposalDocument`] turns a record into ordered sections (header, context,
//! offer, timeline, pricing, next steps, footer) and renders them as a
//! paginated A4 PDF.

pub mod pdf;

use crate::catalog::{get_goal, get_option, get_pack, get_problem};
use crate::pricing::{
    calculate_delivery_date, format_date_fr, format_date_short, format_price, timeline,
};
use crate::proposal::ProposalRecord;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use pdf::{Font, FooterLine, PdfWriter};
use regex::Regex;

/// Characters per body line at 11pt between the margins
const WRAP: usize = 80;

const LEGAL_NOTICE: &str = "Ce document est une proposition commerciale simplifiée, non contractuelle. \
                            Un devis/facture final(e) sera fourni(e) avant démarrage.";

const NEXT_STEP: &str = "Si la proposition vous convient, vous pouvez la valider en cliquant sur \
                         \"Accepter\" dans la page web associée, ou en répondant par message.";

static UNSAFE_FILE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[^a-z0-9_-]+").expect("valid file name pattern"));

/// One block of document content
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    Subtitle(String),
    Heading(String),
    Strong(String),
    Text(String),
    Bullet(String),
    Gap(f32),
}

/// Content of the printed proposal, independent of the output format
#[derive(Debug, Clone)]
pub struct ProposalDocument {
    pub blocks: Vec<Block>,
    pub footer: Vec<FooterLine>,
}

impl ProposalDocument {
    /// Build the document as of `today`. Amounts are recomputed from ids.
    pub fn from_record(record: &ProposalRecord, today: NaiveDate) -> Self {
        let data = &record.data;
        let mut blocks = Vec::new();

        // Header
        let company = if data.prospect_company.is_empty() {
            "Votre entreprise"
        } else {
            data.prospect_company.as_str()
        };
        blocks.push(Block::Title(format!("Proposition commerciale — {}", company)));
        blocks.push(Block::Subtitle(format!(
            "{}  •  Réf: {}  •  Version {}",
            format_date_fr(today),
            record.token.to_uppercase(),
            record.version
        )));
        blocks.push(Block::Subtitle(format!(
            "Valable jusqu'au {}",
            format_date_short(record.valid_until)
        )));
        blocks.push(Block::Gap(6.0));

        // Context
        let problem = get_problem(&data.prospect_problem).map(|p| p.label);
        let goal = get_goal(&data.prospect_goal).map(|g| g.label);
        if problem.is_some() || goal.is_some() {
            blocks.push(Block::Heading("Contexte".to_string()));
            if let Some(problem) = problem {
                blocks.push(Block::Text(format!("Situation : {}", problem)));
            }
            if let Some(goal) = goal {
                blocks.push(Block::Text(format!("Objectif : {}", goal)));
            }
            blocks.push(Block::Gap(6.0));
        }

        // Offer
        if let Some(pack) = get_pack(&data.pack_id) {
            blocks.push(Block::Heading("Offre".to_string()));
            blocks.push(Block::Strong(format!("Pack {}", pack.name)));
            blocks.push(Block::Text(pack.description.to_string()));
            blocks.push(Block::Gap(4.0));
            blocks.extend(pack.features.iter().map(|f| Block::Bullet(f.to_string())));
            blocks.push(Block::Gap(8.0));

            let options: Vec<Block> = data
                .selected_options
                .iter()
                .filter_map(|id| get_option(id))
                .map(|o| {
                    let suffix = if o.is_monthly { "/mois" } else { "" };
                    Block::Bullet(format!("{} (+{}{})", o.label, format_price(o.price), suffix))
                })
                .collect();
            if !options.is_empty() {
                blocks.push(Block::Strong("Options :".to_string()));
                blocks.extend(options);
                blocks.push(Block::Gap(8.0));
            }
        }

        // Timeline
        blocks.push(Block::Heading("Planning".to_string()));
        for step in timeline(&data.pack_id) {
            blocks.push(Block::Text(format!(
                "{} — {} : {}",
                step.label(),
                step.title,
                step.description
            )));
        }
        blocks.push(Block::Gap(4.0));
        blocks.push(Block::Text(format!(
            "Livraison estimée : {}",
            format_date_fr(calculate_delivery_date(&data.pack_id, today))
        )));
        blocks.push(Block::Gap(10.0));

        // Pricing
        let pricing = record.pricing();
        blocks.push(Block::Heading("Prix".to_string()));
        blocks.push(Block::Strong(format!("Total HT : {}", format_price(pricing.total_price))));
        blocks.push(Block::Text(format!(
            "Acompte ({}%) : {}",
            data.deposit_percent,
            format_price(pricing.deposit_amount)
        )));
        blocks.push(Block::Text(format!(
            "Solde à livraison : {}",
            format_price(pricing.remaining_amount)
        )));
        if let Some(link) = &data.payment_link {
            blocks.push(Block::Text(format!("Paiement de l'acompte : {}", link)));
        }
        blocks.push(Block::Gap(10.0));

        // Next step
        blocks.push(Block::Heading("Prochaine étape".to_string()));
        blocks.push(Block::Text(NEXT_STEP.to_string()));

        Self {
            blocks,
            footer: footer_lines(record),
        }
    }

    pub fn render_pdf(&self) -> Vec<u8> {
        let mut writer = PdfWriter::new();
        writer.set_footer(self.footer.clone());

        for block in &self.blocks {
            match block {
                Block::Title(text) => writer.line(0.0, text, 18.0, Font::Bold, false, 22.0),
                Block::Subtitle(text) => writer.line(0.0, text, 11.0, Font::Regular, true, 16.0),
                Block::Heading(text) => writer.line(0.0, text, 16.0, Font::Bold, false, 24.0),
                Block::Strong(text) => writer.line(0.0, text, 12.0, Font::Bold, false, 16.0),
                Block::Text(text) => writer.paragraph(text, 11.0, Font::Regular, WRAP),
                Block::Bullet(text) => writer.bullet(text, WRAP - 2),
                Block::Gap(height) => writer.gap(*height),
            }
        }

        writer.finish()
    }
}

fn footer_lines(record: &ProposalRecord) -> Vec<FooterLine> {
    let data = &record.data;
    let mut lines = vec![FooterLine {
        y: 74.0,
        size: 11.0,
        font: Font::Bold,
        muted: false,
        text: data.owner_name.clone(),
    }];

    let contact = [data.owner_phone.as_str(), data.owner_email.as_str(), data.owner_website.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("  •  ");
    lines.push(FooterLine {
        y: 60.0,
        size: 10.0,
        font: Font::Regular,
        muted: true,
        text: contact,
    });

    if !data.owner_siret.is_empty() {
        lines.push(FooterLine {
            y: 46.0,
            size: 9.0,
            font: Font::Regular,
            muted: true,
            text: format!("SIRET : {}", data.owner_siret),
        });
    }

    lines.push(FooterLine {
        y: 28.0,
        size: 7.0,
        font: Font::Regular,
        muted: true,
        text: LEGAL_NOTICE.to_string(),
    });
    lines
}

/// `proposition-{company}-{token}.pdf` with the company reduced to safe characters
pub fn file_name(record: &ProposalRecord) -> String {
    let company = if record.data.prospect_company.is_empty() {
        "proposition"
    } else {
        record.data.prospect_company.as_str()
    };
    let company = UNSAFE_FILE_CHARS.replace_all(company, "-");
    format!(
        "proposition-{}-{}.pdf",
        company.trim_matches('-'),
        record.token
    )
}
