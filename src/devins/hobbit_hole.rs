//! Typed template configuration
//!
//! [`HobbitHole`] is what a template engine consumes: the compiled front matter
//! read through well-known keys, with documented defaults for keys that are
//! absent. Building one is a pure function of the compiled map.

use crate::devins::ast::{
    CaseKeyValue, ForeignFunctionStmt, FrontMatter, FrontMatterType, PatternActionFunc, Statement,
};
use indexmap::IndexMap;
use serde::Serialize;

pub const NAME: &str = "name";
pub const DESCRIPTION: &str = "description";
pub const INTERACTION: &str = "interaction";
pub const ACTION_LOCATION: &str = "actionLocation";
pub const SELECTION_STRATEGY: &str = "selectionStrategy";
pub const VARIABLES: &str = "variables";
pub const FUNCTIONS: &str = "functions";
pub const WHEN: &str = "when";
pub const ON_STREAMING: &str = "onStreaming";
pub const ON_STREAMING_END: &str = "onStreamingEnd";
pub const BEFORE_STREAMING: &str = "beforeStreaming";
pub const AFTER_STREAMING: &str = "afterStreaming";
pub const SHORTCUT: &str = "shortcut";
pub const ENABLED: &str = "enabled";
pub const AGENTIC: &str = "agentic";
pub const MODEL: &str = "model";

const DEFAULT_ROUTE: &str = "default";

/// Where the output of a template goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum InteractionType {
    AppendCursor,
    AppendCursorStream,
    OutputFile,
    ReplaceSelection,
    ReplaceCurrentFile,
    InsertBeforeSelection,
    #[default]
    RunPanel,
    OnPaste,
    RightPanel,
    StreamDiff,
}

impl InteractionType {
    pub const ALL: [InteractionType; 10] = [
        InteractionType::AppendCursor,
        InteractionType::AppendCursorStream,
        InteractionType::OutputFile,
        InteractionType::ReplaceSelection,
        InteractionType::ReplaceCurrentFile,
        InteractionType::InsertBeforeSelection,
        InteractionType::RunPanel,
        InteractionType::OnPaste,
        InteractionType::RightPanel,
        InteractionType::StreamDiff,
    ];

    /// Case-insensitive lookup by variant name; unknown names fall back to
    /// `RunPanel`.
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|t| format!("{:?}", t).eq_ignore_ascii_case(name))
            .unwrap_or_default()
    }
}

/// Where a template is offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ActionLocation {
    ContextMenu,
    IntentionMenu,
    TerminalMenu,
    CommitMenu,
    #[default]
    RunPanel,
    InputBox,
    DatabaseMenu,
    ConsoleMenu,
    VcsLogMenu,
    ChatBox,
    InlineChat,
}

impl ActionLocation {
    pub const ALL: [ActionLocation; 11] = [
        ActionLocation::ContextMenu,
        ActionLocation::IntentionMenu,
        ActionLocation::TerminalMenu,
        ActionLocation::CommitMenu,
        ActionLocation::RunPanel,
        ActionLocation::InputBox,
        ActionLocation::DatabaseMenu,
        ActionLocation::ConsoleMenu,
        ActionLocation::VcsLogMenu,
        ActionLocation::ChatBox,
        ActionLocation::InlineChat,
    ];

    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|t| format!("{:?}", t).eq_ignore_ascii_case(name))
            .unwrap_or_default()
    }
}

/// A named post-processor and its arguments, e.g. `saveFile("out.md")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleProcessorSignature {
    pub func_name: String,
    pub args: Vec<String>,
}

/// A variable computed by running a pipeline over pattern matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableTransform {
    pub variable: String,
    pub pattern: String,
    pub funcs: Vec<PatternActionFunc>,
    pub is_query_statement: bool,
}

/// Pipeline run before streaming starts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectAction {
    pub processors: Vec<PatternActionFunc>,
}

impl DirectAction {
    pub fn from_value(value: &FrontMatterType) -> Option<Self> {
        let processors = match value {
            FrontMatterType::Pattern(action) => action.processors.clone(),
            FrontMatterType::Array(items) => items.iter().filter_map(call_processor).collect(),
            FrontMatterType::Identifier(name) | FrontMatterType::String(name) => {
                PatternActionFunc::from_call(name, Vec::new()).into_iter().collect()
            }
            _ => return None,
        };
        Some(Self { processors })
    }
}

/// One arm of an `afterStreaming` case: the key it matches and what it runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRoute {
    pub key: String,
    pub processors: Vec<PatternActionFunc>,
}

/// Decision table evaluated after streaming.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TaskRoutes {
    pub conditions: Vec<CaseKeyValue>,
    pub routes: Vec<TaskRoute>,
    pub default_route: Option<TaskRoute>,
    pub actions: Vec<PatternActionFunc>,
}

impl TaskRoutes {
    pub fn from_value(value: &FrontMatterType) -> Option<Self> {
        let FrontMatterType::Array(items) = value else {
            return None;
        };
        let mut routes = TaskRoutes::default();
        for item in items {
            match item.as_statement() {
                Some(Statement::ConditionCase { conditions, cases }) => {
                    routes.conditions.extend(
                        conditions
                            .iter()
                            .filter_map(FrontMatterType::as_statement)
                            .filter_map(case_key_value),
                    );
                    for case in cases.iter().filter_map(FrontMatterType::as_statement) {
                        let Some(kv) = case_key_value(case) else {
                            continue;
                        };
                        let route = TaskRoute {
                            key: value_text(&kv.key),
                            processors: processors_of(&kv.value),
                        };
                        if route.key == DEFAULT_ROUTE {
                            routes.default_route = Some(route);
                        } else {
                            routes.routes.push(route);
                        }
                    }
                }
                Some(_) => routes.actions.extend(call_processor(item)),
                None => {
                    tracing::warn!(value = %item, "ignoring afterStreaming entry");
                }
            }
        }
        Some(routes)
    }
}

fn case_key_value(stmt: &Statement) -> Option<CaseKeyValue> {
    match stmt {
        Statement::CaseKeyValue(kv) => Some(kv.clone()),
        _ => None,
    }
}

/// Text of a scalar value without quoting.
fn value_text(value: &FrontMatterType) -> String {
    value
        .as_text()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

fn processors_of(value: &FrontMatterType) -> Vec<PatternActionFunc> {
    match value {
        FrontMatterType::Array(items) => items.iter().filter_map(call_processor).collect(),
        FrontMatterType::Pattern(action) => action.processors.clone(),
        other => call_processor(other).into_iter().collect(),
    }
}

/// `name(args)` compiled as a method call, resolved into a pipeline function.
fn call_processor(value: &FrontMatterType) -> Option<PatternActionFunc> {
    let signature = signature(value)?;
    PatternActionFunc::from_call(&signature.func_name, signature.args)
}

fn signature(value: &FrontMatterType) -> Option<LifecycleProcessorSignature> {
    match value {
        FrontMatterType::Expression(stmt) => match stmt.as_ref() {
            Statement::MethodCall {
                receiver,
                arguments,
                ..
            } => Some(LifecycleProcessorSignature {
                func_name: receiver.to_string(),
                args: arguments
                    .iter()
                    .flatten()
                    .map(value_text)
                    .collect(),
            }),
            other => Some(LifecycleProcessorSignature {
                func_name: other.to_string(),
                args: Vec::new(),
            }),
        },
        FrontMatterType::Identifier(name) | FrontMatterType::String(name) => {
            Some(LifecycleProcessorSignature {
                func_name: name.clone(),
                args: Vec::new(),
            })
        }
        _ => None,
    }
}

fn lifecycle_processors(value: &FrontMatterType) -> Vec<LifecycleProcessorSignature> {
    match value {
        FrontMatterType::Array(items) => items
            .iter()
            .filter(|item| item.is_expression())
            .filter_map(signature)
            .collect(),
        FrontMatterType::Identifier(_) | FrontMatterType::String(_) => {
            signature(value).into_iter().collect()
        }
        _ => Vec::new(),
    }
}

fn variable_transforms(value: &FrontMatterType) -> IndexMap<String, VariableTransform> {
    let FrontMatterType::Object(map) = value else {
        return IndexMap::new();
    };
    map.iter()
        .filter_map(|(key, value)| {
            let transform = match value {
                FrontMatterType::Pattern(action) => VariableTransform {
                    variable: key.clone(),
                    pattern: action.regex().to_string(),
                    funcs: action.processors.clone(),
                    is_query_statement: false,
                },
                FrontMatterType::String(query) if !query.is_empty() => VariableTransform {
                    variable: key.clone(),
                    pattern: query.clone(),
                    funcs: Vec::new(),
                    is_query_statement: true,
                },
                _ => return None,
            };
            Some((key.clone(), transform))
        })
        .collect()
}

fn foreign_functions(value: &FrontMatterType) -> IndexMap<String, ForeignFunctionStmt> {
    let FrontMatterType::Object(map) = value else {
        return IndexMap::new();
    };
    map.values()
        .filter_map(|value| match value.as_statement() {
            Some(Statement::ForeignFunction(func)) => Some((func.func_name.clone(), func.clone())),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HobbitHole {
    pub name: String,
    pub description: String,
    pub interaction: InteractionType,
    pub action_location: ActionLocation,
    pub selection_strategy: Option<String>,
    pub variables: IndexMap<String, VariableTransform>,
    pub when: Statement,
    pub on_streaming: Vec<LifecycleProcessorSignature>,
    pub on_streaming_end: Vec<LifecycleProcessorSignature>,
    pub before_streaming: Option<DirectAction>,
    pub after_streaming: Option<TaskRoutes>,
    pub shortcut: Option<String>,
    pub enabled: bool,
    pub agentic: bool,
    pub model: Option<String>,
    pub functions: IndexMap<String, ForeignFunctionStmt>,
    pub user_data: FrontMatter,
}

impl Default for HobbitHole {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            interaction: InteractionType::default(),
            action_location: ActionLocation::default(),
            selection_strategy: None,
            variables: IndexMap::new(),
            when: Statement::value(FrontMatterType::Boolean(true)),
            on_streaming: Vec::new(),
            on_streaming_end: Vec::new(),
            before_streaming: None,
            after_streaming: None,
            shortcut: None,
            enabled: true,
            agentic: false,
            model: None,
            functions: IndexMap::new(),
            user_data: FrontMatter::new(),
        }
    }
}

impl HobbitHole {
    pub fn from_front_matter(front_matter: &FrontMatter) -> Self {
        let text = |key: &str| {
            front_matter
                .get(key)
                .and_then(FrontMatterType::as_text)
                .map(str::to_string)
        };
        let flag = |key: &str, default: bool| {
            front_matter
                .get(key)
                .and_then(FrontMatterType::as_bool)
                .unwrap_or(default)
        };

        let user_data = front_matter
            .iter()
            .filter(|(key, _)| ![NAME, DESCRIPTION, INTERACTION, ACTION_LOCATION].contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let when = match front_matter.get(WHEN) {
            Some(FrontMatterType::Expression(stmt)) => stmt.as_ref().clone(),
            Some(other) => Statement::value(other.clone()),
            None => Statement::value(FrontMatterType::Boolean(true)),
        };

        Self {
            name: text(NAME).unwrap_or_default(),
            description: text(DESCRIPTION).unwrap_or_default(),
            interaction: text(INTERACTION)
                .map(|name| InteractionType::from_name(&name))
                .unwrap_or_default(),
            action_location: text(ACTION_LOCATION)
                .map(|name| ActionLocation::from_name(&name))
                .unwrap_or_default(),
            selection_strategy: text(SELECTION_STRATEGY),
            variables: front_matter
                .get(VARIABLES)
                .map(variable_transforms)
                .unwrap_or_default(),
            when,
            on_streaming: front_matter
                .get(ON_STREAMING)
                .map(lifecycle_processors)
                .unwrap_or_default(),
            on_streaming_end: front_matter
                .get(ON_STREAMING_END)
                .map(lifecycle_processors)
                .unwrap_or_default(),
            before_streaming: front_matter.get(BEFORE_STREAMING).and_then(DirectAction::from_value),
            after_streaming: front_matter.get(AFTER_STREAMING).and_then(TaskRoutes::from_value),
            shortcut: text(SHORTCUT),
            enabled: flag(ENABLED, true),
            agentic: flag(AGENTIC, false),
            model: text(MODEL),
            functions: front_matter
                .get(FUNCTIONS)
                .map(foreign_functions)
                .unwrap_or_default(),
            user_data,
        }
    }

    /// Descriptions of the well-known keys.
    pub fn keys() -> IndexMap<&'static str, &'static str> {
        IndexMap::from([
            (NAME, "The display name of the action"),
            (DESCRIPTION, "The tips for the action"),
            (WHEN, "The condition to run the action"),
            (INTERACTION, "Where the output of the action goes"),
            (ACTION_LOCATION, "Where the action is offered"),
            (SHORTCUT, "The shortcut for the action"),
            (SELECTION_STRATEGY, "How to select the element the action applies to"),
            (VARIABLES, "Variables computed by pattern actions"),
            (FUNCTIONS, "Foreign functions available to the action"),
            (ON_STREAMING, "Processors applied to streamed text"),
            (ON_STREAMING_END, "Processors run after streaming ends"),
            (BEFORE_STREAMING, "Pipeline run before streaming"),
            (AFTER_STREAMING, "Routing of tasks after streaming"),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devins::ast::{Operator, OperatorType, PatternAction};
    use rstest::rstest;

    fn call(name: &str, args: &[&str]) -> FrontMatterType {
        FrontMatterType::expression(Statement::method_call(
            FrontMatterType::Identifier(name.into()),
            FrontMatterType::Empty,
            Some(args.iter().map(|a| FrontMatterType::String(a.to_string())).collect()),
        ))
    }

    #[test]
    fn empty_front_matter_uses_defaults() {
        let hole = HobbitHole::from_front_matter(&FrontMatter::new());
        assert_eq!(hole, HobbitHole::default());
        assert_eq!(hole.when, Statement::value(FrontMatterType::Boolean(true)));
        assert!(hole.enabled);
        assert!(!hole.agentic);
    }

    #[rstest(
        name,
        expected,
        case("ReplaceSelection", InteractionType::ReplaceSelection),
        case("appendcursorstream", InteractionType::AppendCursorStream),
        case("nowhere", InteractionType::RunPanel)
    )]
    fn interaction_lookup(name: &str, expected: InteractionType) {
        assert_eq!(InteractionType::from_name(name), expected);
    }

    #[test]
    fn reads_well_known_keys() {
        let mut fm = FrontMatter::new();
        fm.insert(NAME.into(), FrontMatterType::String("Summarize".into()));
        fm.insert(ACTION_LOCATION.into(), FrontMatterType::Identifier("ContextMenu".into()));
        fm.insert(ENABLED.into(), FrontMatterType::Boolean(false));
        fm.insert(MODEL.into(), FrontMatterType::String("gpt".into()));
        fm.insert(
            WHEN.into(),
            FrontMatterType::expression(Statement::Comparison {
                left: FrontMatterType::Variable("lang".into()),
                operator: Operator::new(OperatorType::Equal),
                right: FrontMatterType::String("rust".into()),
            }),
        );
        fm.insert("custom".into(), FrontMatterType::Number(3));

        let hole = HobbitHole::from_front_matter(&fm);
        assert_eq!(hole.name, "Summarize");
        assert_eq!(hole.action_location, ActionLocation::ContextMenu);
        assert!(!hole.enabled);
        assert_eq!(hole.model.as_deref(), Some("gpt"));
        assert_eq!(hole.when.to_string(), "$lang == \"rust\"");
        assert!(!hole.user_data.contains_key(NAME));
        assert!(hole.user_data.contains_key("custom"));
        assert!(hole.user_data.contains_key(WHEN));
    }

    #[test]
    fn lifecycle_processors_from_calls_and_names() {
        let mut fm = FrontMatter::new();
        fm.insert(
            ON_STREAMING_END.into(),
            FrontMatterType::Array(vec![call("verifyCode", &[]), call("saveFile", &["out.md"])]),
        );
        fm.insert(ON_STREAMING.into(), FrontMatterType::Identifier("logging".into()));

        let hole = HobbitHole::from_front_matter(&fm);
        assert_eq!(
            hole.on_streaming_end,
            vec![
                LifecycleProcessorSignature {
                    func_name: "verifyCode".into(),
                    args: vec![],
                },
                LifecycleProcessorSignature {
                    func_name: "saveFile".into(),
                    args: vec!["out.md".into()],
                },
            ]
        );
        assert_eq!(hole.on_streaming[0].func_name, "logging");
    }

    #[test]
    fn variables_and_before_streaming() {
        let mut vars = IndexMap::new();
        vars.insert(
            "code".to_string(),
            FrontMatterType::Pattern(PatternAction::new(
                "/.*\\.rs/",
                vec![PatternActionFunc::Head { number: 3 }],
            )),
        );
        vars.insert("plain".to_string(), FrontMatterType::Number(1));
        let mut fm = FrontMatter::new();
        fm.insert(VARIABLES.into(), FrontMatterType::Object(vars));
        fm.insert(
            BEFORE_STREAMING.into(),
            FrontMatterType::Array(vec![call("print", &["hi"])]),
        );

        let hole = HobbitHole::from_front_matter(&fm);
        assert_eq!(hole.variables.len(), 1);
        assert_eq!(hole.variables["code"].pattern, ".*\\.rs");
        assert_eq!(
            hole.before_streaming,
            Some(DirectAction {
                processors: vec![PatternActionFunc::Print {
                    texts: vec!["hi".into()]
                }],
            })
        );
    }

    #[test]
    fn after_streaming_routes_split_default() {
        let case = |key: &str, calls: Vec<FrontMatterType>| {
            FrontMatterType::expression(Statement::CaseKeyValue(CaseKeyValue::new(
                FrontMatterType::String(key.into()),
                FrontMatterType::Array(calls),
            )))
        };
        let value = FrontMatterType::Array(vec![FrontMatterType::expression(
            Statement::ConditionCase {
                conditions: vec![],
                cases: vec![
                    case("error", vec![call("notify", &["failed"])]),
                    case("default", vec![call("execute", &["next.devin"])]),
                ],
            },
        )]);
        let routes = TaskRoutes::from_value(&value).expect("routes");
        assert_eq!(routes.routes.len(), 1);
        assert_eq!(routes.routes[0].key, "error");
        assert_eq!(
            routes.default_route.map(|r| r.processors),
            Some(vec![PatternActionFunc::Execute {
                filename: "next.devin".into(),
                variable_names: vec![],
            }])
        );
    }
}
