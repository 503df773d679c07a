//! Scripted in-memory session for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use vartree_dap::{
    DapCapabilities, DapError, EvaluateResponseBody, Scope, SetVariableArguments,
    SetVariableResponseBody, Variable, VariablesArguments, VariablesFilter,
};

use crate::session::DebugSession;

#[derive(Default)]
pub(crate) struct MockSession {
    pub terminated: AtomicBool,
    pub capabilities: DapCapabilities,
    pub scopes: Vec<Scope>,
    pub named: HashMap<i64, Vec<Variable>>,
    pub variables_error: Option<String>,
    pub set_variable_result: Option<Result<SetVariableResponseBody, String>>,
    pub evaluations: HashMap<String, Result<EvaluateResponseBody, String>>,
    pub scopes_calls: AtomicUsize,
    pub variables_calls: Mutex<Vec<VariablesArguments>>,
    pub set_variable_calls: Mutex<Vec<SetVariableArguments>>,
    pub evaluate_calls: Mutex<Vec<(String, String)>>,
}

pub(crate) fn rejected(command: &str, message: &str) -> DapError {
    DapError::Rejected {
        command: command.into(),
        message: message.into(),
    }
}

pub(crate) fn var(name: &str, value: &str, reference: i64) -> Variable {
    Variable {
        name: name.into(),
        value: value.into(),
        variables_reference: reference,
        ..Variable::default()
    }
}

pub(crate) fn scope(name: &str, reference: i64, named: i64) -> Scope {
    Scope {
        name: name.into(),
        variables_reference: reference,
        named_variables: Some(named),
        indexed_variables: None,
        expensive: false,
        source: None,
        line: None,
    }
}

pub(crate) fn eval_body(result: &str, reference: i64) -> EvaluateResponseBody {
    EvaluateResponseBody {
        result: result.into(),
        result_type: None,
        variables_reference: reference,
        named_variables: None,
        indexed_variables: None,
    }
}

impl MockSession {
    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }

    pub fn variables_requests(&self) -> Vec<VariablesArguments> {
        self.variables_calls.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.scopes_calls.load(Ordering::SeqCst)
            + self.variables_calls.lock().unwrap().len()
            + self.set_variable_calls.lock().unwrap().len()
            + self.evaluate_calls.lock().unwrap().len()
    }
}

impl DebugSession for MockSession {
    fn id(&self) -> &str {
        "mock"
    }

    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    fn capabilities(&self) -> DapCapabilities {
        self.capabilities.clone()
    }

    async fn scopes(&self) -> Result<Vec<Scope>, DapError> {
        self.scopes_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.scopes.clone())
    }

    async fn variables(&self, args: VariablesArguments) -> Result<Vec<Variable>, DapError> {
        self.variables_calls.lock().unwrap().push(args.clone());
        if let Some(message) = &self.variables_error {
            return Err(rejected("variables", message));
        }
        match args.filter {
            Some(VariablesFilter::Indexed) => {
                let start = args.start.unwrap_or(0);
                let count = args.count.unwrap_or(0);
                Ok((start..start + count)
                    .map(|i| var(&format!("[{i}]"), &i.to_string(), 0))
                    .collect())
            }
            _ => Ok(self
                .named
                .get(&args.variables_reference)
                .cloned()
                .unwrap_or_default()),
        }
    }

    async fn set_variable(
        &self,
        args: SetVariableArguments,
    ) -> Result<SetVariableResponseBody, DapError> {
        self.set_variable_calls.lock().unwrap().push(args);
        match &self.set_variable_result {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(message)) => Err(rejected("setVariable", message)),
            None => Err(rejected("setVariable", "not scripted")),
        }
    }

    async fn evaluate(
        &self,
        expression: &str,
        context: &str,
    ) -> Result<Option<EvaluateResponseBody>, DapError> {
        self.evaluate_calls
            .lock()
            .unwrap()
            .push((expression.to_string(), context.to_string()));
        match self.evaluations.get(expression) {
            Some(Ok(body)) => Ok(Some(body.clone())),
            Some(Err(message)) => Err(rejected("evaluate", message)),
            None => Ok(None),
        }
    }
}
