//! Record shapes of the bonus console.
//!
//! Each shape maps the payload of one backend listing into typed values.

use chrono::NaiveDate;

use crate::record::{Field, Record, Value};
use crate::source::{FromPayload, PayloadRow};

pub const MISSING_TITLE: &str = "Sem titulo informado";

fn title_or_placeholder(row: &PayloadRow<'_>, column: &str) -> String {
    row.text(column).unwrap_or_else(|| MISSING_TITLE.to_string())
}

/// A bonus amount, `Money` when numeric, kept as given otherwise.
fn amount(row: &PayloadRow<'_>, column: &str) -> Value {
    match row.number(column) {
        Some(n) => Value::Money(n),
        None => row.text(column).into(),
    }
}

fn date(value: Option<NaiveDate>) -> Value {
    value.map(Value::Date).unwrap_or(Value::Null)
}

fn number(value: Option<f64>) -> Value {
    value.map(Value::Number).unwrap_or(Value::Null)
}

// -------------------------------- Condition -------------------------------- //

/// A condition group of a development, listing how many agencies it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub id: i64,
    pub titulo: String,
    pub empreendimento: Option<String>,
    pub quant_imobiliarias: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionField {
    Id,
    Titulo,
    Empreendimento,
    QuantImobiliarias,
}

impl Field for ConditionField {
    fn all() -> &'static [Self] {
        &[
            ConditionField::Id,
            ConditionField::Titulo,
            ConditionField::Empreendimento,
            ConditionField::QuantImobiliarias,
        ]
    }

    fn title(&self) -> &'static str {
        match self {
            ConditionField::Id => "ID",
            ConditionField::Titulo => "Titulo",
            ConditionField::Empreendimento => "Empreendimento",
            ConditionField::QuantImobiliarias => "Quantidade Imobiliarias",
        }
    }

    fn visible(&self) -> bool {
        *self != ConditionField::Id
    }
}

impl Record for Condition {
    type Field = ConditionField;
    const SEARCH_FIELD: ConditionField = ConditionField::Titulo;
    const DEFAULT_SORT: Option<ConditionField> = Some(ConditionField::Titulo);
    const DELETABLE: bool = true;

    fn id(&self) -> i64 {
        self.id
    }

    fn value(&self, field: ConditionField) -> Value {
        match field {
            ConditionField::Id => Value::Number(self.id as f64),
            ConditionField::Titulo => self.titulo.as_str().into(),
            ConditionField::Empreendimento => self.empreendimento.clone().into(),
            ConditionField::QuantImobiliarias => number(self.quant_imobiliarias),
        }
    }
}

impl FromPayload for Condition {
    const ID_COLUMN: &'static str = "id_grupo";

    fn from_payload(row: &PayloadRow<'_>) -> Option<Self> {
        Some(Self {
            id: row.id(Self::ID_COLUMN)?,
            titulo: title_or_placeholder(row, "titulo"),
            empreendimento: row.text("empreendimento"),
            quant_imobiliarias: row.number("quantidade_imobiliarias"),
        })
    }
}

// ----------------------------- AgencyCondition ----------------------------- //

/// A condition as it applies to one agency.
#[derive(Debug, Clone, PartialEq)]
pub struct AgencyCondition {
    pub id: i64,
    pub grupo: Option<i64>,
    pub titulo: String,
    pub imobiliaria: Option<String>,
    pub data: Option<NaiveDate>,
    pub comissao: Value,
    pub empreendimento: Option<String>,
    pub quant_propostas: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgencyConditionField {
    Id,
    Titulo,
    Imobiliaria,
    Empreendimento,
    Data,
    Comissao,
    QuantPropostas,
}

impl Field for AgencyConditionField {
    fn all() -> &'static [Self] {
        &[
            AgencyConditionField::Id,
            AgencyConditionField::Titulo,
            AgencyConditionField::Imobiliaria,
            AgencyConditionField::Empreendimento,
            AgencyConditionField::Data,
            AgencyConditionField::Comissao,
            AgencyConditionField::QuantPropostas,
        ]
    }

    fn title(&self) -> &'static str {
        match self {
            AgencyConditionField::Id => "ID",
            AgencyConditionField::Titulo => "Titulo",
            AgencyConditionField::Imobiliaria => "Imobiliaria",
            AgencyConditionField::Empreendimento => "Empreendimento",
            AgencyConditionField::Data => "Data",
            AgencyConditionField::Comissao => "Comissão",
            AgencyConditionField::QuantPropostas => "Propostas",
        }
    }

    fn visible(&self) -> bool {
        *self != AgencyConditionField::Id
    }
}

impl Record for AgencyCondition {
    type Field = AgencyConditionField;
    const SEARCH_FIELD: AgencyConditionField = AgencyConditionField::Imobiliaria;
    const DEFAULT_SORT: Option<AgencyConditionField> = Some(AgencyConditionField::Titulo);
    const DELETABLE: bool = true;

    fn id(&self) -> i64 {
        self.id
    }

    fn value(&self, field: AgencyConditionField) -> Value {
        match field {
            AgencyConditionField::Id => Value::Number(self.id as f64),
            AgencyConditionField::Titulo => self.titulo.as_str().into(),
            AgencyConditionField::Imobiliaria => self.imobiliaria.clone().into(),
            AgencyConditionField::Empreendimento => self.empreendimento.clone().into(),
            AgencyConditionField::Data => date(self.data),
            AgencyConditionField::Comissao => self.comissao.clone(),
            AgencyConditionField::QuantPropostas => number(self.quant_propostas),
        }
    }
}

impl FromPayload for AgencyCondition {
    const ID_COLUMN: &'static str = "id_condicao_imob";
    const GROUP_COLUMN: Option<&'static str> = Some("id_grupo");

    fn from_payload(row: &PayloadRow<'_>) -> Option<Self> {
        Some(Self {
            id: row.id(Self::ID_COLUMN)?,
            grupo: Self::GROUP_COLUMN.and_then(|c| row.id(c)),
            titulo: title_or_placeholder(row, "titulo"),
            imobiliaria: row.text("nome_imobiliaria"),
            data: row.date("data_inicial"),
            comissao: amount(row, "valor_bonificacao"),
            empreendimento: row.text("empreendimento"),
            quant_propostas: row.number("qtd_propostas"),
        })
    }

    fn group(&self) -> Option<i64> {
        self.grupo
    }
}

// ----------------------------- GeneratedBonus ------------------------------ //

/// A bonus the system generated once a condition was met.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedBonus {
    pub id: i64,
    pub titulo: String,
    pub imobiliaria: Option<String>,
    pub data: Option<NaiveDate>,
    pub comissao: Value,
    pub quant_propostas: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedBonusField {
    Id,
    Titulo,
    Imobiliaria,
    Data,
    Comissao,
    QuantPropostas,
}

impl Field for GeneratedBonusField {
    fn all() -> &'static [Self] {
        &[
            GeneratedBonusField::Id,
            GeneratedBonusField::Titulo,
            GeneratedBonusField::Imobiliaria,
            GeneratedBonusField::Data,
            GeneratedBonusField::Comissao,
            GeneratedBonusField::QuantPropostas,
        ]
    }

    fn title(&self) -> &'static str {
        match self {
            GeneratedBonusField::Id => "ID",
            GeneratedBonusField::Titulo => "Titulo",
            GeneratedBonusField::Imobiliaria => "Imobiliaria",
            GeneratedBonusField::Data => "Data",
            GeneratedBonusField::Comissao => "Comissão",
            GeneratedBonusField::QuantPropostas => "Propostas",
        }
    }

    fn visible(&self) -> bool {
        *self != GeneratedBonusField::Id
    }
}

impl Record for GeneratedBonus {
    type Field = GeneratedBonusField;
    const SEARCH_FIELD: GeneratedBonusField = GeneratedBonusField::Titulo;
    const DEFAULT_SORT: Option<GeneratedBonusField> = Some(GeneratedBonusField::Titulo);

    fn id(&self) -> i64 {
        self.id
    }

    fn value(&self, field: GeneratedBonusField) -> Value {
        match field {
            GeneratedBonusField::Id => Value::Number(self.id as f64),
            GeneratedBonusField::Titulo => self.titulo.as_str().into(),
            GeneratedBonusField::Imobiliaria => self.imobiliaria.clone().into(),
            GeneratedBonusField::Data => date(self.data),
            GeneratedBonusField::Comissao => self.comissao.clone(),
            GeneratedBonusField::QuantPropostas => number(self.quant_propostas),
        }
    }
}

impl FromPayload for GeneratedBonus {
    const ID_COLUMN: &'static str = "id";

    fn from_payload(row: &PayloadRow<'_>) -> Option<Self> {
        Some(Self {
            id: row.id(Self::ID_COLUMN)?,
            titulo: title_or_placeholder(row, "titulo"),
            imobiliaria: row.text("imobiliaria"),
            data: row.date("data"),
            comissao: amount(row, "comissao"),
            quant_propostas: row.number("quant_propostas"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ViewConfig;
    use crate::source::{DataSource, FileSource};
    use crate::viewmodel::TableViewModel;
    use std::path::Path;

    fn fixture<R: FromPayload>(name: &str) -> Vec<R> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name);
        FileSource::<R>::open(path).unwrap().fetch().unwrap()
    }

    #[test]
    fn condition_payload_mapping() {
        let records = fixture::<Condition>("conditions.csv");
        let untitled = records.iter().find(|r| r.id == 3).unwrap();
        assert_eq!(untitled.titulo, MISSING_TITLE);
        assert_eq!(untitled.value(ConditionField::QuantImobiliarias), Value::Number(2.0));
    }

    #[test]
    fn agency_condition_payload_mapping() {
        let records = fixture::<AgencyCondition>("agency_conditions.csv");
        let first = &records[0];
        assert_eq!(first.id, 10);
        assert_eq!(first.grupo, Some(1));
        assert_eq!(first.value(AgencyConditionField::Data).to_string(), "02/02/2023");
        assert_eq!(first.value(AgencyConditionField::Comissao).to_string(), "R$ 1200");
        assert_eq!(first.value(AgencyConditionField::Imobiliaria).to_string(), "Bairru Imobiliaria");

        // no bonus value renders empty, no title gets the placeholder
        let second = &records[1];
        assert_eq!(second.comissao, Value::Null);
        assert_eq!(second.value(AgencyConditionField::Comissao).to_string(), "");
        assert_eq!(second.titulo, MISSING_TITLE);
    }

    #[test]
    fn agency_conditions_search_by_agency() {
        let records = fixture::<AgencyCondition>("agency_conditions.csv");
        let mut vm = TableViewModel::for_record::<AgencyCondition>(&ViewConfig::default());
        vm.set_search_text("TESTE");
        let derived = vm.derive(&records);
        assert_eq!(derived.total_filtered, 2);
        assert!(derived
            .visible
            .iter()
            .all(|r| r.imobiliaria.as_deref().unwrap_or("").contains("Teste")));
    }

    #[test]
    fn agency_conditions_sort_by_date_chronologically() {
        let records = fixture::<AgencyCondition>("agency_conditions.csv");
        let mut vm = TableViewModel::for_record::<AgencyCondition>(&ViewConfig::default());
        vm.set_sort(AgencyConditionField::Data);
        let ids: Vec<i64> = vm.derive(&records).visible.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![13, 10, 11, 12]);
    }

    #[test]
    fn generated_bonus_scenario() {
        let records = fixture::<GeneratedBonus>("generated_bonuses.csv");
        assert_eq!(records.len(), 4);

        let mut vm = TableViewModel::for_record::<GeneratedBonus>(&ViewConfig::default());
        vm.set_search_text("bairru");
        // "titulo" is already the sort column, clicking it would reverse it
        assert_eq!(vm.sort_key(), Some(GeneratedBonusField::Titulo));
        vm.set_sort(GeneratedBonusField::Data);
        vm.set_sort(GeneratedBonusField::Titulo);
        vm.set_page_size(5);

        let derived = vm.derive(&records);
        let visible: Vec<(i64, &str)> = derived
            .visible
            .iter()
            .map(|r| (r.id, r.titulo.as_str()))
            .collect();
        assert_eq!(
            visible,
            vec![(4, "Bairru Empreendimentos"), (1, "Bairru Imobiliária")]
        );
        assert_eq!(derived.total_filtered, 2);
        assert_eq!(derived.page_index, 0);
    }

    #[test]
    fn only_condition_views_are_deletable() {
        assert!(Condition::DELETABLE);
        assert!(AgencyCondition::DELETABLE);
        assert!(!GeneratedBonus::DELETABLE);
    }

    #[test]
    fn id_column_is_hidden() {
        assert!(!ConditionField::Id.visible());
        assert!(ConditionField::all().iter().filter(|f| f.visible()).count() == 3);
        assert!(!AgencyConditionField::Id.visible());
        assert!(!GeneratedBonusField::Id.visible());
    }
}
