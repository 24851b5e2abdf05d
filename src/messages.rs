//! Ready-to-send messages
//!
//! Builds the WhatsApp, SMS and email texts an owner pastes to a prospect.
//! Pure functions: same context, same texts.

use crate::catalog::get_pack;
use crate::pricing::{calculate_delivery_date, format_date_fr, format_date_short, format_price};
use crate::proposal::ProposalRecord;
use chrono::NaiveDate;
use serde::Serialize;

/// Everything a template can mention
#[derive(Debug, Clone)]
pub struct MessageContext {
    pub prospect_name: String,
    pub prospect_company: String,
    pub pack_name: String,
    pub total_price: u32,
    pub delivery_date: NaiveDate,
    pub proposal_url: String,
    pub owner_name: String,
    pub owner_phone: String,
    pub owner_email: String,
    /// Percent and amount, shown together or not at all
    pub deposit: Option<(u8, u32)>,
    pub valid_until: Option<NaiveDate>,
    pub payment_link: Option<String>,
}

impl MessageContext {
    pub fn from_record(record: &ProposalRecord, proposal_url: String, today: NaiveDate) -> Self {
        let data = &record.data;
        let pricing = record.pricing();
        let pack_name = get_pack(&data.pack_id)
            .map(|pack| pack.name.to_string())
            .unwrap_or_else(|| data.pack_id.clone());

        Self {
            prospect_name: data.prospect_name.clone(),
            prospect_company: data.prospect_company.clone(),
            pack_name,
            total_price: pricing.total_price,
            delivery_date: calculate_delivery_date(&data.pack_id, today),
            proposal_url,
            owner_name: data.owner_name.clone(),
            owner_phone: data.owner_phone.clone(),
            owner_email: data.owner_email.clone(),
            deposit: (data.deposit_percent > 0)
                .then_some((data.deposit_percent, pricing.deposit_amount)),
            valid_until: Some(record.valid_until),
            payment_link: data.payment_link.clone(),
        }
    }

    fn first_name(&self) -> &str {
        self.prospect_name
            .split_whitespace()
            .next()
            .unwrap_or(&self.prospect_name)
    }

    fn deposit_text(&self) -> Option<String> {
        self.deposit
            .map(|(percent, amount)| format!("Acompte ({}%) : {}.", percent, format_price(amount)))
    }

    fn valid_text(&self) -> Option<String> {
        self.valid_until
            .map(|date| format!("Valable jusqu'au {}.", format_date_short(date)))
    }

    fn payment_text(&self) -> Option<String> {
        self.payment_link
            .as_ref()
            .map(|link| format!("Paiement de l'acompte : {}", link))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Whatsapp,
    Sms,
    Email,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTemplate {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub content: String,
}

/// Join the present parts with a space
fn inline(parts: &[Option<String>]) -> String {
    parts
        .iter()
        .flatten()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// The five templates, always in the same order
pub fn generate_messages(ctx: &MessageContext) -> Vec<MessageTemplate> {
    let first_name = ctx.first_name();
    let price = format_price(ctx.total_price);
    let delivery = format_date_fr(ctx.delivery_date);
    let deposit = ctx.deposit_text();
    let valid = ctx.valid_text();
    let payment = ctx.payment_text();

    let mut whatsapp = format!(
        "Bonjour {first_name} 👋\n\n\
         Suite à notre échange, voici votre proposition pour {company} :\n\
         👉 {url}\n\n\
         Pack {pack} à {price} — livraison estimée le {delivery}.\n",
        company = ctx.prospect_company,
        url = ctx.proposal_url,
        pack = ctx.pack_name,
    );
    let terms = inline(&[deposit.clone(), valid.clone()]);
    if !terms.is_empty() {
        whatsapp.push('\n');
        whatsapp.push_str(&terms);
        whatsapp.push('\n');
    }
    if let Some(payment) = &payment {
        whatsapp.push_str(payment);
        whatsapp.push('\n');
    }
    whatsapp.push_str(&format!("\nDites-moi si vous avez des questions !\n{}", ctx.owner_name));

    let call_me = (!ctx.owner_phone.is_empty())
        .then(|| format!("Appelez-moi au {}", ctx.owner_phone));
    let sms = inline(&[
        Some(format!(
            "{first_name}, votre proposition est prête : {} — {price}, livraison {delivery}.",
            ctx.proposal_url
        )),
        valid.clone(),
        Some("Des questions ?".to_string()),
        call_me,
    ]);

    let mut summary = vec![
        format!("• Pack {} — {} HT", ctx.pack_name, price),
        format!("• Livraison estimée : {}", delivery),
    ];
    summary.extend(deposit.iter().map(|text| format!("• {}", text)));
    summary.extend(valid.iter().map(|text| format!("• {}", text)));
    summary.extend(payment.iter().map(|text| format!("• {}", text)));

    let signature = if ctx.owner_phone.is_empty() {
        ctx.owner_email.clone()
    } else {
        format!("{} | {}", ctx.owner_phone, ctx.owner_email)
    };
    let email = format!(
        "Bonjour {first_name},\n\n\
         Merci pour notre échange.\n\n\
         Vous trouverez votre proposition personnalisée ici :\n\
         {url}\n\n\
         Résumé :\n\
         {summary}\n\n\
         N'hésitez pas à me contacter pour toute question.\n\n\
         Cordialement,\n\
         {owner}\n\
         {signature}",
        url = ctx.proposal_url,
        summary = summary.join("\n"),
        owner = ctx.owner_name,
    );

    let followup = format!(
        "{first_name}, avez-vous pu consulter la proposition ? 👉 {}\n\n\
         Je reste dispo si vous souhaitez en discuter. Bonne journée !",
        ctx.proposal_url
    );

    let urgent = format!(
        "{first_name}, {} Votre site pro à {price} : {}. On démarre ?",
        valid
            .clone()
            .unwrap_or_else(|| "proposition valable 14 jours.".to_string()),
        ctx.proposal_url
    );

    vec![
        MessageTemplate {
            id: "whatsapp-initial",
            name: "WhatsApp — Premier envoi",
            kind: MessageKind::Whatsapp,
            subject: None,
            content: whatsapp,
        },
        MessageTemplate {
            id: "sms-short",
            name: "SMS — Court",
            kind: MessageKind::Sms,
            subject: None,
            content: sms,
        },
        MessageTemplate {
            id: "email-formal",
            name: "Email — Formel",
            kind: MessageKind::Email,
            subject: Some(format!("Votre proposition site web — {}", ctx.prospect_company)),
            content: email,
        },
        MessageTemplate {
            id: "whatsapp-followup",
            name: "WhatsApp — Relance J+3",
            kind: MessageKind::Whatsapp,
            subject: None,
            content: followup,
        },
        MessageTemplate {
            id: "sms-urgent",
            name: "SMS — Offre limitée",
            kind: MessageKind::Sms,
            subject: None,
            content: urgent,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn context() -> MessageContext {
        MessageContext {
            prospect_name: "Marie Dupont".to_string(),
            prospect_company: "Boulangerie Dupont".to_string(),
            pack_name: "Essentiel".to_string(),
            total_price: 1680,
            delivery_date: NaiveDate::from_ymd_opt(2024, 1, 11).unwrap(),
            proposal_url: "https://qop.example.com/p/abcdEFGH1234ijkl".to_string(),
            owner_name: "Alex Martin".to_string(),
            owner_phone: "06 12 34 56 78".to_string(),
            owner_email: "alex@example.com".to_string(),
            deposit: Some((30, 504)),
            valid_until: NaiveDate::from_ymd_opt(2024, 1, 15),
            payment_link: None,
        }
    }

    #[test]
    fn test_generates_five_templates_in_order() {
        let ids: Vec<_> = generate_messages(&context()).iter().map(|m| m.id).collect();
        assert_eq!(
            ids,
            vec!["whatsapp-initial", "sms-short", "email-formal", "whatsapp-followup", "sms-urgent"]
        );
    }

    #[test]
    fn test_email_has_subject_and_conditional_lines() {
        let messages = generate_messages(&context());
        let email = &messages[2];
        assert_eq!(email.subject.as_deref(), Some("Votre proposition site web — Boulangerie Dupont"));
        assert!(email.content.starts_with("Bonjour Marie,"));
        assert!(email.content.contains("• Acompte (30%) : 504\u{a0}€."));
        assert!(email.content.contains("• Valable jusqu'au 15/01/2024."));
        assert!(email.content.contains("06 12 34 56 78 | alex@example.com"));
        assert!(email.content.contains("11 janvier 2024"));
    }

    #[test]
    fn test_optional_parts_are_dropped() {
        let mut ctx = context();
        ctx.deposit = None;
        ctx.valid_until = None;
        ctx.owner_phone.clear();

        let messages = generate_messages(&ctx);
        assert!(!messages[0].content.contains("Acompte"));
        assert!(!messages[1].content.contains("Appelez-moi"));
        assert!(messages[2].content.ends_with("Alex Martin\nalex@example.com"));
        assert!(messages[4].content.contains("proposition valable 14 jours."));
    }

    #[test]
    fn test_payment_link_is_included() {
        let mut ctx = context();
        ctx.payment_link = Some("https://pay.example.com/x".to_string());
        let messages = generate_messages(&ctx);
        assert!(messages[0].content.contains("https://pay.example.com/x"));
        assert!(messages[2].content.contains("• Paiement de l'acompte : https://pay.example.com/x"));
    }

    #[test]
    fn test_sms_mentions_phone_and_price() {
        let messages = generate_messages(&context());
        let sms = &messages[1].content;
        assert!(sms.starts_with("Marie, votre proposition est prête"));
        assert!(sms.contains("1\u{202f}680\u{a0}€"));
        assert!(sms.ends_with("Appelez-moi au 06 12 34 56 78"));
        assert!(!sms.contains("  "));
    }

    #[test]
    fn test_serializes_kind_as_type() {
        let json = serde_json::to_value(&generate_messages(&context())[0]).unwrap();
        assert_eq!(json["type"], "whatsapp");
        assert!(json.get("subject").is_none());
    }
}
