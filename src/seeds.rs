//! Built-in catalog that keeps the service useful without external config.
//!
//! Tables are plain `'static` data converted into owned domain records by
//! `builtin_catalog()`. Scenario text is Spanish.

use std::collections::BTreeMap;

use crate::catalog::Catalog;
use crate::domain::{
  ConstraintCondition, Context, Goal, GoalSkillMapping, SampledValue, Template, TemplateConstraint,
  VariableDefinition, VariableType,
};

pub const SKILL_PORCENTAJES: &str = "numeros-porcentajes";
pub const SKILL_DECIMALES: &str = "numeros-decimales";
pub const SKILL_FRACCIONES: &str = "numeros-fracciones";
pub const SKILL_ENTEROS: &str = "numeros-enteros";
pub const SKILL_DIVISIBILIDAD: &str = "numeros-divisibilidad";
pub const SKILL_PRIMOS: &str = "numeros-primos";
pub const SKILL_PROPORCIONALIDAD: &str = "algebra-proporcionalidad";
pub const SKILL_ECUACIONES: &str = "algebra-ecuaciones-lineales";
pub const SKILL_PROMEDIO: &str = "datos-promedio";

#[derive(Clone, Copy)]
struct ContextDef {
  id: &'static str,
  category: &'static str,
  description: &'static str,
  skills: &'static [&'static str],
}

#[derive(Clone, Copy)]
struct GoalDef {
  id: &'static str,
  level: &'static str,
  description: &'static str,
  eje: &'static str,
}

#[derive(Clone, Copy)]
struct MappingDef {
  goal: &'static str,
  combo: &'static [&'static str],
  min: usize,
  max: Option<usize>,
}

#[derive(Clone, Copy)]
struct VarDef {
  name: &'static str,
  kind: VariableType,
  min: f64,
  max: f64,
  step: Option<f64>,
  unit: Option<&'static str>,
  options: &'static [&'static str],
}

#[derive(Clone, Copy)]
struct ConstraintDef {
  var: &'static str,
  cond: ConstraintCondition,
  value: Option<i64>,
}

#[derive(Clone, Copy)]
struct TemplateDef {
  id: &'static str,
  name: &'static str,
  text: &'static str,
  latex: Option<&'static str>,
  goal: &'static str,
  skills: &'static [&'static str],
  contexts: &'static [&'static str],
  vars: &'static [VarDef],
  constraints: &'static [ConstraintDef],
  level: u8,
}

macro_rules! int {
  ($name:expr, $min:expr, $max:expr, step $step:expr, $unit:expr) => {
    VarDef { name: $name, kind: VariableType::Integer, min: $min as f64, max: $max as f64, step: Some($step as f64), unit: Some($unit), options: &[] }
  };
  ($name:expr, $min:expr, $max:expr) => {
    VarDef { name: $name, kind: VariableType::Integer, min: $min as f64, max: $max as f64, step: None, unit: None, options: &[] }
  };
}

macro_rules! dec {
  ($name:expr, $min:expr, $max:expr, step $step:expr, $unit:expr) => {
    VarDef { name: $name, kind: VariableType::Decimal, min: $min, max: $max, step: Some($step), unit: Some($unit), options: &[] }
  };
  ($name:expr, $min:expr, $max:expr, $unit:expr) => {
    VarDef { name: $name, kind: VariableType::Decimal, min: $min, max: $max, step: None, unit: Some($unit), options: &[] }
  };
}

macro_rules! frac {
  ($name:expr) => {
    VarDef { name: $name, kind: VariableType::Fraction, min: 0.0, max: 1.0, step: None, unit: None, options: &[] }
  };
}

macro_rules! cat {
  ($name:expr, $opts:expr) => {
    VarDef { name: $name, kind: VariableType::Categorical, min: 0.0, max: 0.0, step: None, unit: None, options: $opts }
  };
}

macro_rules! rule {
  ($var:expr, $cond:ident) => {
    ConstraintDef { var: $var, cond: ConstraintCondition::$cond, value: None }
  };
  ($var:expr, $cond:ident, $value:expr) => {
    ConstraintDef { var: $var, cond: ConstraintCondition::$cond, value: Some($value) }
  };
}

const CONTEXTS: &[ContextDef] = &[
  ContextDef {
    id: "tienda-ropa",
    category: "comercio",
    description: "Una tienda de ropa del centro prepara su temporada de liquidación. La dueña revisa precios, descuentos y el stock disponible para organizar las ofertas de la semana.",
    skills: &[SKILL_PORCENTAJES, SKILL_DECIMALES, SKILL_PROPORCIONALIDAD, SKILL_ENTEROS, SKILL_PROMEDIO],
  },
  ContextDef {
    id: "feria-libre",
    category: "comercio",
    description: "En la feria libre del barrio, una familia compra frutas y verduras por kilo y compara precios entre los distintos puestos.",
    skills: &[SKILL_DECIMALES, SKILL_FRACCIONES, SKILL_PROPORCIONALIDAD, SKILL_PORCENTAJES],
  },
  ContextDef {
    id: "receta-cocina",
    category: "hogar",
    description: "Para el cumpleaños de la abuela, Tomás adapta una receta de queque que originalmente rinde para 8 personas.",
    skills: &[SKILL_FRACCIONES, SKILL_PROPORCIONALIDAD, SKILL_DECIMALES],
  },
  ContextDef {
    id: "viaje-bus",
    category: "transporte",
    description: "Un curso planifica un viaje de estudio en bus hacia el sur. Deben estimar distancias, tiempos de viaje y el costo que pagará cada estudiante.",
    skills: &[SKILL_PROPORCIONALIDAD, SKILL_DECIMALES, SKILL_ECUACIONES, SKILL_ENTEROS, SKILL_PROMEDIO],
  },
  ContextDef {
    id: "huerto-escolar",
    category: "medio-ambiente",
    description: "El huerto escolar se reorganiza en parcelas rectangulares y los estudiantes reparten semillas y plantas en grupos iguales.",
    skills: &[SKILL_DIVISIBILIDAD, SKILL_ENTEROS, SKILL_FRACCIONES, SKILL_PRIMOS],
  },
  ContextDef {
    id: "base-antartica",
    category: "ciencia",
    description: "Una base científica en la Antártica registra la temperatura exterior varias veces al día durante una semana de invierno.",
    skills: &[SKILL_ENTEROS, SKILL_PROMEDIO, SKILL_DECIMALES],
  },
];

const GOALS: &[GoalDef] = &[
  GoalDef { id: "calcular-porcentaje", level: "aplicar", description: "Calcular el porcentaje de una cantidad", eje: "numeros" },
  GoalDef { id: "aplicar-descuento", level: "aplicar", description: "Encadenar descuentos y recargos sobre un precio", eje: "numeros" },
  GoalDef { id: "comparar-cantidades", level: "analizar", description: "Comparar cantidades o precios para decidir", eje: "numeros" },
  GoalDef { id: "operar-fracciones", level: "aplicar", description: "Operar con fracciones en contexto", eje: "numeros" },
  GoalDef { id: "resolver-proporcion", level: "aplicar", description: "Resolver problemas de proporcionalidad directa", eje: "algebra" },
  GoalDef { id: "calcular-promedio", level: "comprender", description: "Calcular e interpretar un promedio", eje: "datos" },
  GoalDef { id: "operar-enteros", level: "comprender", description: "Sumar y restar números enteros", eje: "numeros" },
  GoalDef { id: "plantear-ecuacion", level: "crear", description: "Plantear una ecuación lineal que modele la situación", eje: "algebra" },
  GoalDef { id: "agrupar-divisibilidad", level: "aplicar", description: "Repartir en grupos iguales usando divisibilidad", eje: "numeros" },
  GoalDef { id: "identificar-primos", level: "analizar", description: "Reconocer números primos a partir de sus divisores", eje: "numeros" },
];

const MAPPINGS: &[MappingDef] = &[
  MappingDef { goal: "calcular-porcentaje", combo: &[SKILL_PORCENTAJES], min: 1, max: Some(1) },
  MappingDef { goal: "aplicar-descuento", combo: &[SKILL_PORCENTAJES, SKILL_DECIMALES], min: 2, max: Some(3) },
  MappingDef { goal: "comparar-cantidades", combo: &[SKILL_PORCENTAJES, SKILL_PROPORCIONALIDAD], min: 2, max: None },
  MappingDef { goal: "comparar-cantidades", combo: &[SKILL_DECIMALES], min: 1, max: Some(2) },
  MappingDef { goal: "operar-fracciones", combo: &[SKILL_FRACCIONES], min: 1, max: Some(2) },
  MappingDef { goal: "resolver-proporcion", combo: &[SKILL_PROPORCIONALIDAD], min: 1, max: None },
  MappingDef { goal: "calcular-promedio", combo: &[SKILL_PROMEDIO], min: 1, max: None },
  MappingDef { goal: "operar-enteros", combo: &[SKILL_ENTEROS], min: 1, max: Some(2) },
  MappingDef { goal: "plantear-ecuacion", combo: &[SKILL_ECUACIONES], min: 1, max: None },
  MappingDef { goal: "agrupar-divisibilidad", combo: &[SKILL_DIVISIBILIDAD], min: 1, max: None },
  MappingDef { goal: "identificar-primos", combo: &[SKILL_PRIMOS], min: 1, max: Some(2) },
];

const FRUTAS: &[&str] = &["manzanas", "paltas", "tomates", "naranjas", "plátanos"];
const INGREDIENTES: &[&str] = &["azúcar", "harina", "leche", "mantequilla"];

const TEMPLATES: &[TemplateDef] = &[
  TemplateDef {
    id: "porcentaje-descuento-simple",
    name: "Descuento sobre precio original",
    text: "Una chaqueta cuesta ${{precio_original}} y tiene un descuento de {{descuento}}%. ¿Cuánto dinero se descuenta?",
    latex: Some(r"\text{Descuento} = {{precio_original}} \cdot \frac{ {{descuento}} }{100}"),
    goal: "calcular-porcentaje",
    skills: &[SKILL_PORCENTAJES],
    contexts: &["tienda-ropa", "feria-libre"],
    vars: &[int!("descuento", 5, 50, step 5, "%"), int!("precio_original", 100, 1000, step 50, "$")],
    constraints: &[rule!("descuento", DivisibleBy, 5)],
    level: 1,
  },
  TemplateDef {
    id: "porcentaje-precio-final",
    name: "Precio final con descuento y recargo",
    text: "Un polerón de ${{precio}} tiene {{descuento}}% de descuento, pero al pagar con tarjeta se agrega un recargo de {{recargo}}% sobre el precio rebajado. ¿Cuál es el precio final?",
    latex: None,
    goal: "aplicar-descuento",
    skills: &[SKILL_PORCENTAJES, SKILL_DECIMALES],
    contexts: &["tienda-ropa"],
    vars: &[dec!("precio", 9990.0, 29990.0, step 1000.0, "$"), int!("descuento", 10, 40, step 5, "%"), dec!("recargo", 0.5, 3.5, "%")],
    constraints: &[],
    level: 2,
  },
  TemplateDef {
    id: "comparar-ofertas",
    name: "Comparar dos ofertas",
    text: "La tienda A ofrece {{descuento}}% de descuento en pantalones de ${{precio}} y la tienda B ofrece \"lleve 3, pague 2\". ¿Qué oferta conviene más al comprar 3 pantalones?",
    latex: None,
    goal: "comparar-cantidades",
    skills: &[SKILL_PORCENTAJES, SKILL_PROPORCIONALIDAD],
    contexts: &["tienda-ropa", "feria-libre"],
    vars: &[int!("descuento", 10, 45, step 5, "%"), int!("precio", 8000, 20000, step 500, "$")],
    constraints: &[rule!("descuento", NotEquals, 30)],
    level: 3,
  },
  TemplateDef {
    id: "comparar-precio-kilo",
    name: "Comparar precio por kilo",
    text: "En un puesto el kilo de {{fruta}} cuesta ${{precio_a}} y en otro ${{precio_b}}. ¿Cuánto se ahorra al comprar {{kilos}} kg en el puesto más barato?",
    latex: None,
    goal: "comparar-cantidades",
    skills: &[SKILL_DECIMALES],
    contexts: &["feria-libre", "tienda-ropa"],
    vars: &[cat!("fruta", FRUTAS), int!("precio_a", 800, 2000, step 50, "$"), int!("precio_b", 800, 2000, step 50, "$"), dec!("kilos", 0.5, 3.0, "kg")],
    constraints: &[],
    level: 1,
  },
  TemplateDef {
    id: "fracciones-receta",
    name: "Fracción por porción",
    text: "La receta usa {{fraccion}} de taza de {{ingrediente}} por cada porción. ¿Cuántas tazas se necesitan para {{porciones}} porciones?",
    latex: Some(r"{{fraccion}} \times {{porciones}}"),
    goal: "operar-fracciones",
    skills: &[SKILL_FRACCIONES],
    contexts: &["receta-cocina", "feria-libre", "huerto-escolar"],
    vars: &[frac!("fraccion"), cat!("ingrediente", INGREDIENTES), int!("porciones", 2, 12)],
    constraints: &[rule!("porciones", DivisibleBy, 2)],
    level: 1,
  },
  TemplateDef {
    id: "proporcion-escala",
    name: "Escalar cantidades proporcionalmente",
    text: "Si {{cantidad_base}} unidades alcanzan para 8 personas, ¿cuántas unidades se necesitan para {{personas}} personas manteniendo la proporción?",
    latex: Some(r"\frac{ {{cantidad_base}} }{8} = \frac{x}{ {{personas}} }"),
    goal: "resolver-proporcion",
    skills: &[SKILL_PROPORCIONALIDAD],
    contexts: &["receta-cocina", "tienda-ropa", "feria-libre", "viaje-bus"],
    vars: &[int!("cantidad_base", 200, 800, step 50, "g"), int!("personas", 4, 24)],
    constraints: &[rule!("personas", DivisibleBy, 4)],
    level: 2,
  },
  TemplateDef {
    id: "proporcion-velocidad",
    name: "Distancia a velocidad constante",
    text: "El bus recorre {{distancia}} km en {{horas}} horas a velocidad constante. ¿Cuántos kilómetros recorre en {{horas_nuevas}} horas?",
    latex: None,
    goal: "resolver-proporcion",
    skills: &[SKILL_PROPORCIONALIDAD, SKILL_DECIMALES],
    contexts: &["viaje-bus"],
    vars: &[int!("distancia", 120, 480, step 20, "km"), int!("horas", 2, 6), dec!("horas_nuevas", 1.0, 8.0, "h")],
    constraints: &[rule!("horas", GreaterThan, 1)],
    level: 2,
  },
  TemplateDef {
    id: "ecuacion-costo-bus",
    name: "Ecuación de costo por estudiante",
    text: "El arriendo del bus cuesta ${{costo_fijo}} más ${{costo_km}} por kilómetro. Si viajan {{estudiantes}} estudiantes, plantea la expresión del costo por estudiante para x kilómetros.",
    latex: Some(r"C(x) = \frac{ {{costo_fijo}} + {{costo_km}}x }{ {{estudiantes}} }"),
    goal: "plantear-ecuacion",
    skills: &[SKILL_ECUACIONES],
    contexts: &["viaje-bus"],
    vars: &[int!("costo_fijo", 50000, 150000, step 10000, "$"), int!("costo_km", 300, 900, step 50, "$"), int!("estudiantes", 20, 40)],
    constraints: &[],
    level: 3,
  },
  TemplateDef {
    id: "promedio-ventas",
    name: "Promedio de ventas diarias",
    text: "Durante tres días se vendieron {{v1}}, {{v2}} y {{v3}} prendas. ¿Cuál es el promedio diario de ventas?",
    latex: Some(r"\bar{x} = \frac{ {{v1}} + {{v2}} + {{v3}} }{3}"),
    goal: "calcular-promedio",
    skills: &[SKILL_PROMEDIO],
    contexts: &["tienda-ropa", "viaje-bus"],
    vars: &[int!("v1", 10, 60), int!("v2", 10, 60), int!("v3", 10, 60)],
    constraints: &[],
    level: 1,
  },
  TemplateDef {
    id: "promedio-temperaturas",
    name: "Promedio de temperaturas bajo cero",
    text: "Se registraron temperaturas de {{t1}} °C, {{t2}} °C y {{t3}} °C. ¿Cuál fue la temperatura promedio?",
    latex: None,
    goal: "calcular-promedio",
    skills: &[SKILL_PROMEDIO, SKILL_ENTEROS],
    contexts: &["base-antartica"],
    vars: &[int!("t1", -30, -5), int!("t2", -30, -5), int!("t3", -30, -5)],
    constraints: &[],
    level: 2,
  },
  TemplateDef {
    id: "enteros-variacion",
    name: "Variación de temperatura",
    text: "A las 6:00 el termómetro marca {{t_inicial}} °C y al mediodía la temperatura sube {{aumento}} grados. ¿Qué temperatura marca al mediodía?",
    latex: Some(r"{{t_inicial}} + {{aumento}}"),
    goal: "operar-enteros",
    skills: &[SKILL_ENTEROS],
    contexts: &["base-antartica"],
    vars: &[int!("t_inicial", -35, -10), int!("aumento", 5, 25)],
    constraints: &[rule!("t_inicial", LessThan, 0)],
    level: 1,
  },
  TemplateDef {
    id: "enteros-inventario",
    name: "Balance de inventario",
    text: "El inventario parte con {{stock}} prendas; durante el día se venden {{ventas}} y llegan {{reposicion}} nuevas. ¿Cuántas prendas quedan al cierre?",
    latex: None,
    goal: "operar-enteros",
    skills: &[SKILL_ENTEROS],
    contexts: &["tienda-ropa", "huerto-escolar"],
    vars: &[int!("stock", 40, 120), int!("ventas", 10, 40), int!("reposicion", 5, 30)],
    constraints: &[],
    level: 1,
  },
  TemplateDef {
    id: "divisibilidad-parcelas",
    name: "Reparto exacto en parcelas",
    text: "Hay {{semillas}} semillas para repartir en 6 parcelas sin que sobre ninguna. ¿Cuántas semillas van en cada parcela?",
    latex: None,
    goal: "agrupar-divisibilidad",
    skills: &[SKILL_DIVISIBILIDAD],
    contexts: &["huerto-escolar"],
    vars: &[int!("semillas", 24, 120)],
    constraints: &[rule!("semillas", DivisibleBy, 6)],
    level: 1,
  },
  TemplateDef {
    id: "primos-filas",
    name: "Filas iguales con un número primo de plantas",
    text: "El huerto tiene {{plantas}} plantas. ¿Se pueden ordenar en filas iguales de más de una planta sin usar una sola fila? Justifica usando los divisores de {{plantas}}.",
    latex: None,
    goal: "identificar-primos",
    skills: &[SKILL_PRIMOS],
    contexts: &["huerto-escolar"],
    vars: &[int!("plantas", 11, 97)],
    constraints: &[rule!("plantas", Prime)],
    level: 2,
  },
];

const TOPICS: &[(&str, &str)] = &[
  ("matematicas", "Números y operaciones"),
  ("algebra", "Álgebra y funciones"),
  ("estadistica", "Probabilidad y estadística"),
  ("geometria", "Geometría"),
];

/// The built-in catalog records, in table order.
pub fn builtin_parts() -> (Vec<Context>, Vec<Goal>, Vec<GoalSkillMapping>, Vec<Template>) {
  let contexts = CONTEXTS
    .iter()
    .map(|c| Context {
      id: c.id.into(),
      category: c.category.into(),
      description: c.description.into(),
      compatible_skills: c.skills.iter().map(|s| s.to_string()).collect(),
    })
    .collect();

  let goals = GOALS
    .iter()
    .map(|g| Goal {
      id: g.id.into(),
      cognitive_level: g.level.into(),
      description: g.description.into(),
      metadata: BTreeMap::from([("eje".to_string(), g.eje.to_string())]),
    })
    .collect();

  let mappings = MAPPINGS
    .iter()
    .map(|m| GoalSkillMapping {
      goal_id: m.goal.into(),
      skill_combination: m.combo.iter().map(|s| s.to_string()).collect(),
      min_skills: m.min,
      max_skills: m.max,
    })
    .collect();

  let templates = TEMPLATES.iter().map(to_template).collect();

  (contexts, goals, mappings, templates)
}

pub fn builtin_catalog() -> Catalog {
  let (contexts, goals, mappings, templates) = builtin_parts();
  Catalog::new(contexts, goals, mappings, templates)
}

/// Default subject → topic table.
pub fn default_topics() -> BTreeMap<String, String> {
  TOPICS.iter().map(|(s, t)| (s.to_string(), t.to_string())).collect()
}

fn to_template(t: &TemplateDef) -> Template {
  Template {
    id: t.id.into(),
    name: t.name.into(),
    template_text: t.text.into(),
    template_latex: t.latex.map(str::to_string),
    goal_id: t.goal.into(),
    required_skills: t.skills.iter().map(|s| s.to_string()).collect(),
    compatible_contexts: t.contexts.iter().map(|s| s.to_string()).collect(),
    variables: t.vars.iter().map(to_variable).collect(),
    constraints: t
      .constraints
      .iter()
      .map(|c| TemplateConstraint {
        variable: c.var.into(),
        condition: c.cond,
        value: c.value.map(SampledValue::Integer),
      })
      .collect(),
    difficulty_level: t.level,
  }
}

fn to_variable(v: &VarDef) -> VariableDefinition {
  let numeric = matches!(v.kind, VariableType::Integer | VariableType::Decimal);
  VariableDefinition {
    name: v.name.into(),
    var_type: v.kind,
    min: numeric.then_some(v.min),
    max: numeric.then_some(v.max),
    step: v.step,
    unit: v.unit.map(str::to_string),
    options: (v.kind == VariableType::Categorical)
      .then(|| v.options.iter().map(|s| s.to_string()).collect()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builtin_catalog_has_no_dangling_references() {
    let cat = builtin_catalog();
    assert_eq!(cat.templates().len(), TEMPLATES.len());
    assert!(cat.validate().is_empty());
  }

  #[test]
  fn every_goal_has_a_template_and_a_mapping() {
    let cat = builtin_catalog();
    for g in cat.goals() {
      assert!(!cat.templates_by_goal(&g.id).is_empty(), "goal {} has no template", g.id);
      assert!(cat.mappings().iter().any(|m| m.goal_id == g.id), "goal {} has no mapping", g.id);
    }
  }

  #[test]
  fn categorical_seeds_carry_options() {
    let cat = builtin_catalog();
    for t in cat.templates() {
      for v in &t.variables {
        if v.var_type == VariableType::Categorical {
          assert!(v.options.as_ref().map_or(false, |o| !o.is_empty()), "{}.{}", t.id, v.name);
        } else if v.var_type != VariableType::Fraction {
          assert!(v.min.is_some() && v.max.is_some(), "{}.{}", t.id, v.name);
        }
      }
    }
  }

  #[test]
  fn topics_cover_default_subject() {
    assert_eq!(default_topics().get("matematicas").map(String::as_str), Some("Números y operaciones"));
  }
}
