//! Canned outbound texts.

use crate::catalog::{BankAccount, Category, Segment, SegmentPricing, WalletDetails};

pub const PAYMENT_METHODS_PROMPT: &str = "*¡Perfecto!* La inscripción es muy sencilla 😇\n\n\
Contamos con los siguientes MÉTODOS DE PAGO👇🏻\n\n\
1️⃣ Yape 📲\n\
2️⃣ Depósito o transferencia bancaria 🏛️\n\
3️⃣ Pago online vía Web 🌐 (Aceptamos todas las tarjetas 💳)\n\n\
Coméntame *¿Cuál sería tu mejor opción de pago?* 😊";

pub const ADVISOR_IN_HOURS: &str =
    "✨ Genial, en un momento un asesor se comunicará contigo para resolver tus consultas 😄";

pub const ADVISOR_OUT_OF_HOURS: &str = "⏰ ¡Estamos contentos de poder ayudarte en tu elección! \
Un asesor se comunicará contigo el día de *mañana*. \
Por favor, indícame un *horario* para que se contacte contigo. 🙋🏻‍♀️";

pub const FOLLOW_UP_PROMPT: &str = "💳 Cuéntame, ¿pudiste completar tu pago en el link web? 🌐\n\n\
1️⃣ Sí, todo correcto 🙌\n\
2️⃣ Aún no, necesito ayuda 🤔";

pub const REGISTRATION_CONFIRMED: &str =
    "*¡Ya te hemos registrado al Programa!* 🚀\nRecuerda tener en cuenta lo siguiente 💙👇🏻";

pub const WELCOME_COMMUNITY: &str = "*Bienvenid@ a la Comunidad WE* 💙\n\
¡Que disfrutes tu programa!\n\n\
📲 *Agéndanos en tus contactos* para no perderte ninguna novedad.\n\n\
¡Gracias por confiar en WE! 🚀";

pub const MEMBERSHIP_OFFER: &str = "💎 *Beneficio Exclusivo* 💎\n\n\
Por tu inscripción, adquiere la MEMBRESÍA PLUS con un precio especial.\n\n\
_Válido por 3 días_ 📍";

const INVESTMENT_FOOTER: &str = "*La inversión incluye el CERTIFICADO* 📚";

/// Advisor follow-up text, gated on business hours.
pub fn advisor_message(in_hours: bool) -> &'static str {
    if in_hours {
        ADVISOR_IN_HOURS
    } else {
        ADVISOR_OUT_OF_HOURS
    }
}

/// Investment message for a segment's prices.
///
/// Courses lead with the single payment; programs lead with installments.
/// `price` formats a raw amount for the user's region.
pub fn investment_message<F>(
    promo_headline: Option<&str>,
    category: Category,
    pricing: &SegmentPricing,
    price: F,
) -> String
where
    F: Fn(&str) -> String,
{
    let list = price(&pricing.list);
    let cash = format!(
        "*Al Contado* Ahorro máximo😉\n🔥55% Dcto > {} ~(Normal {list})~",
        price(&pricing.cash)
    );
    let installments = format!(
        "*En Cuotas sin intereses*\n50% Dcto > {} ~(Normal {list})~\n💳 Reserva con {}",
        price(&pricing.installment),
        price(&pricing.reservation)
    );

    let (title, first, second) = match category {
        Category::Course => ("Opciones de pago:", cash, installments),
        Category::Program => ("Facilidades de pago:", installments, cash),
    };

    let body = format!("{title}\n1️⃣ {first}\n\n2️⃣ {second}\n\n{INVESTMENT_FOOTER}");
    match promo_headline {
        Some(headline) => format!("{headline}\n\n{body}"),
        None => body,
    }
}

/// Enrollment data request; students also send proof of enrollment.
pub fn data_collection_prompt(segment: Segment) -> String {
    let student_line = match segment {
        Segment::Student => "🔹Foto de Intranet o Carnet Universitario:\n",
        Segment::Standard => "",
    };
    format!(
        "*Bríndame por favor, los siguientes datos*:\n\n\
         🔹DNI o CÉDULA:\n\
         🔹Nombre completo:\n\
         🔹Número de Celular:\n\
         🔹Fecha de Inicio:\n\
         🔹Correo (Gmail):\n\
         🔹Foto de Voucher:\n\
         {student_line}\n\
         Y listo! 🌟 Cuando realices el pago y envío de tus datos, me avisas para comentarte los siguientes detalles. 🙋🏻‍♀️💙"
    )
}

pub fn wallet_instructions(wallet: &WalletDetails) -> String {
    format!(
        "*Perfecto* ✨\n\nTe envío el número de Yape y Código QR 👇\n\n📲 {} // {}",
        wallet.number, wallet.holder
    )
}

pub fn bank_instructions(account: &BankAccount) -> String {
    format!(
        "👉 ¡Excelente! Te comparto los datos de nuestra cuenta para que realices la transferencia:\n\n\
         🏛️ *Banco: {}*\n\
         Número de cuenta: {}\n\n\
         y desde *otros Bancos*, puedes transferir a esta cuenta:\n\
         CCI: {}\n\n\
         *Titular*: {}",
        account.bank, account.account, account.cci, account.holder
    )
}

pub fn checkout_message(link: &str) -> String {
    format!(
        "👉 Perfecto, puedes hacer tu pago de manera rápida y 100% segura en el siguiente enlace:\n\n\
         🔗 {link}\n\n\
         Te dejo un video con los pasos a seguir 👇"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pricing() -> SegmentPricing {
        SegmentPricing {
            cash: "900".into(),
            installment: "1000".into(),
            list: "2000".into(),
            reservation: "200".into(),
        }
    }

    fn soles(amount: &str) -> String {
        format!("S/ {amount}")
    }

    #[test]
    fn course_leads_with_cash() {
        let msg = investment_message(None, Category::Course, &pricing(), soles);
        let cash = msg.find("S/ 900").unwrap();
        let installments = msg.find("S/ 1000").unwrap();
        assert!(cash < installments);
        assert!(msg.starts_with("Opciones de pago:"));
        assert!(msg.contains("~(Normal S/ 2000)~"));
        assert!(msg.contains("Reserva con S/ 200"));
    }

    #[test]
    fn program_leads_with_installments() {
        let msg = investment_message(Some("*Promo*"), Category::Program, &pricing(), soles);
        assert!(msg.starts_with("*Promo*\n\nFacilidades de pago:"));
        assert!(msg.find("S/ 1000").unwrap() < msg.find("S/ 900").unwrap());
    }

    #[test]
    fn students_are_asked_for_proof() {
        assert!(data_collection_prompt(Segment::Student).contains("Carnet Universitario"));
        assert!(!data_collection_prompt(Segment::Standard).contains("Carnet Universitario"));
    }

    #[test]
    fn advisor_message_is_gated() {
        assert_eq!(advisor_message(true), ADVISOR_IN_HOURS);
        assert_eq!(advisor_message(false), ADVISOR_OUT_OF_HOURS);
    }
}
