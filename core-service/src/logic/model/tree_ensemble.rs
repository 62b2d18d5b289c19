//! Tree Ensemble Classifier - XGBoost JSON models
//!
//! Reads the JSON document written by `Booster.save_model("model.json")`
//! and evaluates it natively. The parsed trees are immutable, so one
//! instance serves every worker without locking.
//!
//! Supported objectives: `multi:softprob`, `multi:softmax` (softmax over
//! per-class margins) and `binary:logistic` (sigmoid, two classes).

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::classifier::{sigmoid, softmax, Classifier, InferenceError};
use crate::logic::artifacts::read_bytes;
use crate::logic::error::LoadError;

// ============================================================================
// JSON DOCUMENT
// ============================================================================

#[derive(Debug, Deserialize)]
struct XgbDocument {
    learner: XgbLearner,
}

#[derive(Debug, Deserialize)]
struct XgbLearner {
    learner_model_param: LearnerModelParam,
    gradient_booster: GradientBooster,
    objective: ObjectiveParam,
}

/// XGBoost writes numeric params as strings ("5E-1", "[5E-1]")
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Param {
    Number(f64),
    Text(String),
}

impl Param {
    fn values(&self) -> Result<Vec<f64>, String> {
        match self {
            Param::Number(n) => Ok(vec![*n]),
            Param::Text(s) => s
                .trim()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .split(',')
                .map(|part| {
                    part.trim()
                        .parse::<f64>()
                        .map_err(|_| format!("cannot parse '{}' as a number", s))
                })
                .collect(),
        }
    }

    fn single(&self) -> Result<f64, String> {
        match self.values()?.as_slice() {
            [value] => Ok(*value),
            other => Err(format!("expected one value, got {}", other.len())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    #[serde(default)]
    base_score: Option<Param>,
    #[serde(default)]
    num_class: Option<Param>,
    #[serde(default)]
    num_feature: Option<Param>,
}

#[derive(Debug, Deserialize)]
struct GradientBooster {
    name: String,
    #[serde(default)]
    model: Option<GbTreeModel>,
}

#[derive(Debug, Deserialize)]
struct GbTreeModel {
    trees: Vec<RawTree>,
    tree_info: Vec<i64>,
}

/// 1.x writes booleans, 2.x writes 0/1
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTree {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f64>,
    default_left: Vec<Flag>,
}

#[derive(Debug, Deserialize)]
struct ObjectiveParam {
    name: String,
}

// ============================================================================
// IN-MEMORY MODEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Softmax,
    Logistic,
}

#[derive(Debug, Clone)]
struct Node {
    leaf: bool,
    left: usize,
    right: usize,
    feature: usize,
    /// XGBoost compares in single precision
    threshold: f32,
    default_left: bool,
    /// Leaf value (leaf nodes only)
    value: f64,
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_raw(raw: &RawTree, index: usize) -> Result<Self, String> {
        let n = raw.left_children.len();
        if n == 0 {
            return Err(format!("tree {} has no nodes", index));
        }
        if raw.right_children.len() != n
            || raw.split_indices.len() != n
            || raw.split_conditions.len() != n
            || raw.default_left.len() != n
        {
            return Err(format!("tree {} has node arrays of different lengths", index));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let left = raw.left_children[i];
            let right = raw.right_children[i];

            if left == -1 {
                nodes.push(Node {
                    leaf: true,
                    left: 0,
                    right: 0,
                    feature: 0,
                    threshold: 0.0,
                    default_left: false,
                    value: raw.split_conditions[i],
                });
                continue;
            }

            // children always come after their parent
            let forward = |c: i64| c > i as i64 && (c as usize) < n;
            if !forward(left) || !forward(right) {
                return Err(format!(
                    "tree {} node {} has invalid children ({}, {})",
                    index, i, left, right
                ));
            }
            if raw.split_indices[i] < 0 {
                return Err(format!("tree {} node {} has a negative split index", index, i));
            }

            nodes.push(Node {
                leaf: false,
                left: left as usize,
                right: right as usize,
                feature: raw.split_indices[i] as usize,
                threshold: raw.split_conditions[i] as f32,
                default_left: raw.default_left[i].is_set(),
                value: 0.0,
            });
        }

        Ok(Self { nodes })
    }

    fn max_feature(&self) -> Option<usize> {
        self.nodes.iter().filter(|n| !n.leaf).map(|n| n.feature).max()
    }

    fn leaf_value(&self, features: &[f64]) -> f64 {
        let mut i = 0;
        loop {
            let node = &self.nodes[i];
            if node.leaf {
                return node.value;
            }
            let x = features[node.feature];
            let go_left = if x.is_nan() {
                node.default_left
            } else {
                (x as f32) < node.threshold
            };
            i = if go_left { node.left } else { node.right };
        }
    }
}

/// Gradient-boosted tree ensemble evaluated in-process
#[derive(Debug, Clone)]
pub struct TreeEnsembleClassifier {
    trees: Vec<Tree>,
    /// Class each tree contributes to
    tree_class: Vec<usize>,
    n_classes: usize,
    /// Declared input width (0 = undeclared)
    declared_features: usize,
    /// Smallest input width the trees can index
    required_features: usize,
    /// Margin every class starts from
    base_margin: Vec<f64>,
    link: Link,
}

impl TreeEnsembleClassifier {
    /// Read and parse a model file
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let bytes = read_bytes(path)?;
        Self::from_slice(&bytes, path)
    }

    /// Parse an in-memory model document
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        Self::from_slice(json.as_bytes(), Path::new("<memory>"))
    }

    fn from_slice(bytes: &[u8], path: &Path) -> Result<Self, LoadError> {
        let doc: XgbDocument = serde_json::from_slice(bytes).map_err(|source| LoadError::Parse {
            path: PathBuf::from(path),
            source,
        })?;
        Self::from_document(doc).map_err(LoadError::Model)
    }

    fn from_document(doc: XgbDocument) -> Result<Self, String> {
        let learner = doc.learner;

        let link = match learner.objective.name.as_str() {
            "multi:softprob" | "multi:softmax" => Link::Softmax,
            "binary:logistic" => Link::Logistic,
            other => return Err(format!("unsupported objective '{}'", other)),
        };

        if learner.gradient_booster.name != "gbtree" {
            return Err(format!(
                "unsupported booster '{}' (only gbtree)",
                learner.gradient_booster.name
            ));
        }
        let model = learner
            .gradient_booster
            .model
            .ok_or_else(|| "gradient_booster.model is missing".to_string())?;

        let params = learner.learner_model_param;
        let num_class = match &params.num_class {
            Some(p) => p.single()?.max(0.0) as usize,
            None => 0,
        };
        let n_classes = match link {
            Link::Logistic => 2,
            Link::Softmax if num_class >= 2 => num_class,
            Link::Softmax => {
                return Err(format!("multi-class objective with num_class = {}", num_class))
            }
        };
        let declared_features = match &params.num_feature {
            Some(p) => p.single()?.max(0.0) as usize,
            None => 0,
        };

        if model.trees.is_empty() {
            return Err("model has no trees".to_string());
        }
        if model.tree_info.len() != model.trees.len() {
            return Err(format!(
                "tree_info has {} entries for {} trees",
                model.tree_info.len(),
                model.trees.len()
            ));
        }

        let output_groups = match link {
            Link::Softmax => n_classes,
            Link::Logistic => 1,
        };
        let tree_class = model
            .tree_info
            .iter()
            .map(|&c| {
                if c >= 0 && (c as usize) < output_groups {
                    Ok(c as usize)
                } else {
                    Err(format!("tree_info entry {} outside 0..{}", c, output_groups))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let trees = model
            .trees
            .iter()
            .enumerate()
            .map(|(i, raw)| Tree::from_raw(raw, i))
            .collect::<Result<Vec<_>, _>>()?;

        let required_features = trees
            .iter()
            .filter_map(Tree::max_feature)
            .max()
            .map_or(0, |m| m + 1);
        if declared_features > 0 && required_features > declared_features {
            return Err(format!(
                "trees split on feature {} but num_feature is {}",
                required_features - 1,
                declared_features
            ));
        }

        let base_score = match &params.base_score {
            Some(p) => p.values()?,
            None => vec![0.5],
        };
        let base_margin = match link {
            Link::Softmax => match base_score.len() {
                1 => vec![base_score[0]; n_classes],
                n if n == n_classes => base_score,
                n => return Err(format!("base_score has {} values for {} classes", n, n_classes)),
            },
            Link::Logistic => {
                let p = match base_score.as_slice() {
                    [p] => *p,
                    _ => return Err("binary model needs a single base_score".to_string()),
                };
                if !(p > 0.0 && p < 1.0) {
                    return Err(format!("base_score {} is not a probability", p));
                }
                vec![(p / (1.0 - p)).ln()]
            }
        };

        Ok(Self {
            trees,
            tree_class,
            n_classes,
            declared_features,
            required_features,
            base_margin,
            link,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Raw per-output-group margins
    fn margins(&self, features: &[f64]) -> Vec<f64> {
        let mut margins = self.base_margin.clone();
        for (tree, &class) in self.trees.iter().zip(self.tree_class.iter()) {
            margins[class] += tree.leaf_value(features);
        }
        margins
    }
}

impl Classifier for TreeEnsembleClassifier {
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        let expected = if self.declared_features > 0 {
            self.declared_features
        } else {
            self.required_features
        };
        if features.len() < self.required_features
            || (self.declared_features > 0 && features.len() != expected)
        {
            return Err(InferenceError(format!(
                "expected {} features, got {}",
                expected,
                features.len()
            )));
        }

        let margins = self.margins(features);

        Ok(match self.link {
            Link::Softmax => softmax(&margins),
            Link::Logistic => {
                let p = sigmoid(margins[0]);
                vec![1.0 - p, p]
            }
        })
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn n_features(&self) -> Option<usize> {
        (self.declared_features > 0).then_some(self.declared_features)
    }

    fn kind(&self) -> &'static str {
        "tree_ensemble"
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::{json, Value};

    /// Depth-1 tree: `x[feature] < threshold` -> left leaf, else right leaf
    pub(crate) fn stump(feature: i64, threshold: f64, left: f64, right: f64) -> Value {
        json!({
            "left_children": [1, -1, -1],
            "right_children": [2, -1, -1],
            "split_indices": [feature, 0, 0],
            "split_conditions": [threshold, left, right],
            "default_left": [1, 0, 0],
            "base_weights": [0.0, left, right],
        })
    }

    pub(crate) fn model_json(
        objective: &str,
        num_class: usize,
        num_feature: usize,
        trees: Vec<Value>,
        tree_info: Vec<i64>,
    ) -> String {
        json!({
            "learner": {
                "learner_model_param": {
                    "base_score": "5E-1",
                    "num_class": num_class.to_string(),
                    "num_feature": num_feature.to_string(),
                },
                "gradient_booster": {
                    "name": "gbtree",
                    "model": {
                        "gbtree_model_param": { "num_trees": trees.len().to_string() },
                        "trees": trees,
                        "tree_info": tree_info,
                    }
                },
                "objective": { "name": objective }
            },
            "version": [2, 0, 3]
        })
        .to_string()
    }

    /// Two classes split on feature 0 at 0.5
    pub(crate) fn two_class_model() -> TreeEnsembleClassifier {
        let json = model_json(
            "multi:softprob",
            2,
            2,
            vec![stump(0, 0.5, 2.0, -2.0), stump(0, 0.5, -2.0, 2.0)],
            vec![0, 1],
        );
        TreeEnsembleClassifier::from_json_str(&json).unwrap()
    }

    #[test]
    fn test_softprob_routes_on_threshold() {
        let model = two_class_model();
        assert_eq!(model.n_classes(), 2);
        assert_eq!(model.n_features(), Some(2));
        assert_eq!(model.n_trees(), 2);

        let low = model.predict_proba(&[0.0, 0.0]).unwrap();
        assert!(low[0] > 0.98);
        let high = model.predict_proba(&[1.0, 0.0]).unwrap();
        assert!(high[1] > 0.98);
        assert!((high.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_is_strict_less_than() {
        let model = two_class_model();
        // equal to the split condition goes right
        let at = model.predict_proba(&[0.5, 0.0]).unwrap();
        assert!(at[1] > at[0]);
    }

    #[test]
    fn test_missing_value_follows_default() {
        let model = two_class_model();
        let p = model.predict_proba(&[f64::NAN, 0.0]).unwrap();
        assert!(p[0] > p[1]);
    }

    #[test]
    fn test_leaf_values_accumulate_per_class() {
        let json = model_json(
            "multi:softprob",
            3,
            1,
            vec![
                stump(0, 0.0, 0.1, 0.1),
                stump(0, 0.0, 0.2, 0.2),
                stump(0, 0.0, 0.0, 0.0),
                stump(0, 0.0, 0.1, 0.1),
            ],
            vec![0, 1, 2, 0],
        );
        let model = TreeEnsembleClassifier::from_json_str(&json).unwrap();
        let p = model.predict_proba(&[1.0]).unwrap();
        // margins 0.2 / 0.2 / 0.0 (+ shared base)
        assert!((p[0] - p[1]).abs() < 1e-12);
        assert!(p[0] > p[2]);
    }

    #[test]
    fn test_binary_logistic() {
        let json = model_json("binary:logistic", 0, 1, vec![stump(0, 0.5, -1.0, 1.0)], vec![0]);
        let model = TreeEnsembleClassifier::from_json_str(&json).unwrap();
        assert_eq!(model.n_classes(), 2);

        let p = model.predict_proba(&[1.0]).unwrap();
        assert!((p[1] - sigmoid(1.0)).abs() < 1e-12);
        assert!((p[0] + p[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_feature_count_checked() {
        let model = two_class_model();
        assert!(model.predict_proba(&[1.0]).is_err());
        assert!(model.predict_proba(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_rejects_invalid_models() {
        let bad_objective = model_json("reg:squarederror", 0, 1, vec![stump(0, 0.5, 0.0, 1.0)], vec![0]);
        assert!(matches!(
            TreeEnsembleClassifier::from_json_str(&bad_objective),
            Err(LoadError::Model(_))
        ));

        let bad_info = model_json("multi:softprob", 2, 1, vec![stump(0, 0.5, 0.0, 1.0)], vec![2]);
        assert!(TreeEnsembleClassifier::from_json_str(&bad_info).is_err());

        let bad_split = model_json("multi:softprob", 2, 1, vec![stump(3, 0.5, 0.0, 1.0)], vec![0]);
        assert!(TreeEnsembleClassifier::from_json_str(&bad_split).is_err());

        let mut cyclic = stump(0, 0.5, 0.0, 1.0);
        cyclic["left_children"] = json!([0, -1, -1]);
        let cyclic = model_json("multi:softprob", 2, 1, vec![cyclic], vec![0]);
        assert!(TreeEnsembleClassifier::from_json_str(&cyclic).is_err());

        assert!(matches!(
            TreeEnsembleClassifier::from_json_str("{not json"),
            Err(LoadError::Parse { .. })
        ));
    }

    #[test]
    fn test_base_score_formats() {
        assert_eq!(Param::Text("5E-1".into()).single().unwrap(), 0.5);
        assert_eq!(Param::Text("[5E-1]".into()).single().unwrap(), 0.5);
        assert_eq!(Param::Number(0.25).single().unwrap(), 0.25);
        assert_eq!(Param::Text("[1,2]".into()).values().unwrap(), vec![1.0, 2.0]);
        assert!(Param::Text("abc".into()).values().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = TreeEnsembleClassifier::load(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, LoadError::Missing(_)));
    }
}
