use finform::form::{FieldValue, FormModel};
use rust_decimal::Decimal;

#[derive(Clone, Debug, PartialEq, finform::form::FormModel)]
struct BudgetForm {
    #[form(rename = "categoriaId")]
    category_id: i64,
    #[form(rename = "monto_max.cantidad")]
    max_amount: Decimal,
    periodo: String,
    note: Option<String>,
}

fn main() {
    let form = BudgetForm {
        category_id: 4,
        max_amount: Decimal::new(250_000, 2),
        periodo: "mensual".to_string(),
        note: None,
    };
    let values = form.to_values();
    assert_eq!(values.get("categoriaId"), Some(&FieldValue::from(4i64)));
    assert_eq!(values.get("note"), Some(&FieldValue::Null));
    assert!(values.get("max_amount").is_none());

    let rebuilt = BudgetForm::from_values(&values).expect("values rebuild the form");
    assert_eq!(rebuilt, form);
}
